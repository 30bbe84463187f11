//! Outbound write payloads.
//!
//! Each struct is the complete, fixed field set the backend accepts for one
//! write. Anything a caller supplies beyond these fields never reaches the
//! wire because there is nowhere to put it.

use crate::de::lenient_date;
use crate::guest::RsvpStatus;
use crate::preferences::PortionSize;
use crate::types::HotelId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Body of `PUT /api/guest/{token}/rsvp`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpPayload {
    pub rsvp_status: RsvpStatus,
    pub number_of_attendees: u32,
    pub special_requests: Option<String>,
}

/// Body of `PUT /api/guest/{token}/travel`; replaces the stored record wholesale
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TravelPayload {
    #[serde(with = "lenient_date")]
    pub arrival_date: Option<NaiveDate>,
    pub arrival_time: Option<String>,
    pub arrival_flight_number: Option<String>,
    pub arrival_airport: Option<String>,
    pub needs_pickup: bool,
    #[serde(with = "lenient_date")]
    pub departure_date: Option<NaiveDate>,
    pub departure_time: Option<String>,
    pub departure_flight_number: Option<String>,
    pub departure_airport: Option<String>,
    pub needs_dropoff: bool,
    pub notes: Option<String>,
}

/// Body of `PUT /api/guest/{token}/hotel`.
///
/// Either `suggested_hotel_id` or the `custom_hotel_*` pair is set; the other
/// branch is left out of the JSON entirely.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HotelPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_hotel_id: Option<HotelId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_hotel_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_hotel_address: Option<String>,
    #[serde(default, with = "lenient_date")]
    pub check_in_date: Option<NaiveDate>,
    #[serde(default, with = "lenient_date")]
    pub check_out_date: Option<NaiveDate>,
    #[serde(default)]
    pub room_type: Option<String>,
    pub number_of_rooms: u32,
    #[serde(default)]
    pub special_requests: Option<String>,
}

/// Body of `PUT /api/guest/{token}/dress-preference` (sent alongside `dress_code_id`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DressPreferencePayload {
    pub planned_outfit: Option<String>,
    pub color_code: Option<String>,
    pub color_name: Option<String>,
    pub needs_shopping_assistance: bool,
    pub notes: Option<String>,
}

/// Body of `PUT /api/guest/{token}/food-preference`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FoodPreferencePayload {
    /// Sorted and deduplicated
    pub dietary_restrictions: Vec<String>,
    pub allergies: Option<String>,
    pub cuisine_preferences: Option<String>,
    pub portion_size: PortionSize,
    pub special_requests: Option<String>,
}
