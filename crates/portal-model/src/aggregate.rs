//! The aggregate record: one guest's complete cross-entity snapshot

use crate::activity::{Activity, ActivityRegistration};
use crate::de::null_as_default;
use crate::guest::{Guest, Wedding};
use crate::preferences::{
    DressCode, DressPreference, FoodMenu, FoodPreference, HotelInfo, HotelPreference,
    SuggestedHotel, TravelInfo,
};
use crate::types::{ActivityId, DressCodeId};
use serde::{Deserialize, Serialize};

/// Response body of `GET /api/guest/{token}`.
///
/// Carries both the embedded representation (per dress code / per activity)
/// and the legacy flat arrays. Reconciling the two is the evaluator's job;
/// this type only decodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub guest: Guest,
    #[serde(default)]
    pub wedding: Wedding,
    #[serde(default)]
    pub travel_info: Option<TravelInfo>,
    #[serde(default)]
    pub hotel_info: Option<HotelInfo>,
    /// Legacy lodging record
    #[serde(default)]
    pub hotel_preference: Option<HotelPreference>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dress_codes: Vec<DressCode>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub food_menus: Vec<FoodMenu>,
    #[serde(default)]
    pub food_preference: Option<FoodPreference>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub activities: Vec<Activity>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub suggested_hotels: Vec<SuggestedHotel>,
    /// Legacy flat dress-preference array
    #[serde(default, deserialize_with = "null_as_default")]
    pub dress_preferences: Vec<DressPreference>,
    /// Legacy flat registration array
    #[serde(default, deserialize_with = "null_as_default")]
    pub activity_registrations: Vec<ActivityRegistration>,
}

impl AggregateRecord {
    /// Minimal aggregate for a guest with nothing filled in
    #[must_use]
    pub fn for_guest(guest: Guest) -> Self {
        Self {
            guest,
            wedding: Wedding::default(),
            travel_info: None,
            hotel_info: None,
            hotel_preference: None,
            dress_codes: Vec::new(),
            food_menus: Vec::new(),
            food_preference: None,
            activities: Vec::new(),
            suggested_hotels: Vec::new(),
            dress_preferences: Vec::new(),
            activity_registrations: Vec::new(),
        }
    }

    /// Dress code by id
    #[must_use]
    pub fn dress_code(&self, id: DressCodeId) -> Option<&DressCode> {
        self.dress_codes.iter().find(|code| code.id == id)
    }

    /// Activity by id
    #[must_use]
    pub fn activity(&self, id: ActivityId) -> Option<&Activity> {
        self.activities.iter().find(|activity| activity.id == id)
    }
}
