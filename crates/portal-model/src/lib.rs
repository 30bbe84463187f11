//! Guest Portal Model
//!
//! Records exchanged with the guest-portal backend:
//! - The aggregate record fetched per guest token
//! - Preference sub-records in both embedded and legacy shapes
//! - Outbound write payloads with fixed field sets
//! - Derived section-completion flags
//!
//! Decoding is deliberately tolerant: optional fields default, `null`
//! collections decode as empty and unknown fields are ignored.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod activity;
pub mod aggregate;
pub mod completion;
pub mod de;
pub mod guest;
pub mod payload;
pub mod preferences;
pub mod types;

pub use activity::{Activity, ActivityRegistration, ActivityRegistrationStatus};
pub use aggregate::AggregateRecord;
pub use completion::{Section, SectionCompletion};
pub use guest::{Guest, RsvpStatus, Wedding};
pub use payload::{
    DressPreferencePayload, FoodPreferencePayload, HotelPayload, RsvpPayload, TravelPayload,
};
pub use preferences::{
    Accommodation, ColorSwatch, DressCode, DressPreference, FoodMenu, FoodPreference, HotelInfo,
    HotelPreference, PortionSize, SuggestedHotel, TravelInfo,
};
pub use types::{ActivityId, DressCodeId, GuestToken, HotelId};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
