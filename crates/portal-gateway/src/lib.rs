//! Guest Portal Gateway
//!
//! The remote data gateway the portal engine talks through:
//! - [`PortalGateway`]: async trait seam, one read and one call per write
//! - [`GatewayError`]: structured, pre-classified failures
//! - [`HttpGateway`]: reqwest implementation of the REST contract
//!
//! # Example
//!
//! ```rust,ignore
//! use portal_gateway::{GatewayConfig, HttpGateway, PortalGateway};
//! use portal_model::GuestToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = HttpGateway::new(&GatewayConfig::new().with_base_url("https://rsvp.example.com"))?;
//! let aggregate = gateway.fetch_aggregate(&GuestToken::new("AB12CD34")).await?;
//! println!("{} is {}", aggregate.guest.full_name(), aggregate.guest.rsvp_status);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod gateway;
pub mod http;

pub use config::GatewayConfig;
pub use error::{ErrorKind, GatewayError, GatewayResult};
pub use gateway::PortalGateway;
pub use http::{HttpGateway, Route};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
