//! Guest Portal Core
//!
//! The guest-portal state aggregation and synchronization engine:
//! - [`PortalStore`]: one cached aggregate per guest token, ordered by fetch sequence
//! - [`evaluate_completion`]: per-section completion from inconsistently shaped records
//! - [`MutationOrchestrator`]: shaped write-through mutations that refresh before returning
//! - [`SessionRegistry`]: per-token sessions with idle eviction
//!
//! # Example
//!
//! ```rust,ignore
//! use portal_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PortalConfig::load_or_default("portal.toml")?.apply_env()?;
//! let gateway = Arc::new(HttpGateway::new(&config.gateway)?);
//! let registry = SessionRegistry::new(gateway, &config);
//!
//! let session = registry.open(&GuestToken::new("AB12CD34")).await?;
//! let outcome = session
//!     .orchestrator()
//!     .update_rsvp(&RsvpInput::new(RsvpStatus::Confirmed).with_attendees(2))
//!     .await?;
//!
//! println!("rsvp complete: {:?}", session.store().completion().map(|c| c.rsvp));
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod evaluator;
pub mod orchestrator;
pub mod session;
pub mod shaping;
pub mod store;

pub use config::PortalConfig;
pub use error::PortalError;
pub use evaluator::{
    evaluate_completion, reconcile, resolve_activity_registration, resolve_dress_preference,
    Evidence, Reconciled, RegistrationSource,
};
pub use orchestrator::{KindStatus, MutationKind, MutationOrchestrator, MutationOutcome, MutationPhase};
pub use session::{PortalSession, SessionRegistry};
pub use shaping::{
    shape_dress_preference, shape_food_preference, shape_hotel, shape_rsvp, shape_travel,
    ColorChoice, DressPreferenceInput, FoodPreferenceInput, HotelInput, RsvpInput, TravelInput,
};
pub use store::{LoadState, PortalStore, PortalView, RefreshOutcome, Snapshot};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a guest portal session
    pub use crate::{
        ColorChoice, DressPreferenceInput, FoodPreferenceInput, HotelInput, LoadState,
        MutationKind, MutationOrchestrator, PortalConfig, PortalError, PortalStore, RsvpInput,
        SessionRegistry, TravelInput,
    };
    pub use portal_gateway::{GatewayError, HttpGateway, PortalGateway};
    pub use portal_model::{ActivityId, DressCodeId, GuestToken, HotelId, RsvpStatus};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
