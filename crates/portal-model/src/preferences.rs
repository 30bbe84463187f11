//! Guest-supplied preference records: travel, lodging, attire and food

use crate::de::{lenient_date, null_as_default};
use crate::types::{DressCodeId, HotelId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arrival/departure logistics (0..1 per guest)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TravelInfo {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, with = "lenient_date")]
    pub arrival_date: Option<NaiveDate>,
    #[serde(default)]
    pub arrival_time: Option<String>,
    #[serde(default)]
    pub arrival_flight_number: Option<String>,
    #[serde(default)]
    pub arrival_airport: Option<String>,
    #[serde(default)]
    pub needs_pickup: bool,
    #[serde(default, with = "lenient_date")]
    pub departure_date: Option<NaiveDate>,
    #[serde(default)]
    pub departure_time: Option<String>,
    #[serde(default)]
    pub departure_flight_number: Option<String>,
    #[serde(default)]
    pub departure_airport: Option<String>,
    #[serde(default)]
    pub needs_dropoff: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Where the guest is staying: exactly one branch is meaningful
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Accommodation {
    /// One of the couple's suggested hotels
    Suggested { hotel_id: HotelId },
    /// Somewhere else
    Custom {
        name: String,
        #[serde(default)]
        address: Option<String>,
    },
}

/// Lodging record (0..1 per guest)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HotelInfo {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub suggested_hotel_id: Option<HotelId>,
    #[serde(default)]
    pub custom_hotel_name: Option<String>,
    #[serde(default)]
    pub custom_hotel_address: Option<String>,
    #[serde(default, with = "lenient_date")]
    pub check_in_date: Option<NaiveDate>,
    #[serde(default, with = "lenient_date")]
    pub check_out_date: Option<NaiveDate>,
    #[serde(default)]
    pub room_type: Option<String>,
    #[serde(default)]
    pub number_of_rooms: Option<u32>,
    #[serde(default)]
    pub special_requests: Option<String>,
}

impl HotelInfo {
    /// Reads the stored record back as an [`Accommodation`].
    ///
    /// The backend does not enforce exclusivity; a suggested reference wins
    /// over a custom name when both are present.
    #[must_use]
    pub fn accommodation(&self) -> Option<Accommodation> {
        if let Some(hotel_id) = self.suggested_hotel_id {
            return Some(Accommodation::Suggested { hotel_id });
        }
        self.custom_hotel_name
            .as_ref()
            .filter(|name| !name.trim().is_empty())
            .map(|name| Accommodation::Custom {
                name: name.clone(),
                address: self.custom_hotel_address.clone(),
            })
    }
}

/// Legacy lodging record kept by older backends
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HotelPreference {
    #[serde(default)]
    pub hotel_id: Option<HotelId>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Hotel the couple recommends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedHotel {
    pub id: HotelId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub price_range: Option<String>,
    #[serde(default)]
    pub distance_from_venue: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One colour in a dress-code palette
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSwatch {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Attire guidance for one wedding event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DressCode {
    pub id: DressCodeId,
    #[serde(default)]
    pub event_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub dress_code_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub color_palette: Vec<ColorSwatch>,
    /// Embedded preference; takes precedence over the legacy array
    #[serde(default)]
    pub guest_preference: Option<DressPreference>,
}

/// Guest outfit plan for one dress code
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DressPreference {
    #[serde(default)]
    pub id: Option<i64>,
    /// Present in the legacy array; may be omitted when embedded
    #[serde(default)]
    pub dress_code_id: Option<DressCodeId>,
    #[serde(default)]
    pub planned_outfit: Option<String>,
    #[serde(default)]
    pub color_code: Option<String>,
    #[serde(default)]
    pub color_name: Option<String>,
    #[serde(default)]
    pub needs_shopping_assistance: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Menu published by the couple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodMenu {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dietary_tags: Vec<String>,
}

/// Portion size preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortionSize {
    Small,
    #[default]
    Regular,
    Large,
}

impl fmt::Display for PortionSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PortionSize::Small => "small",
            PortionSize::Regular => "regular",
            PortionSize::Large => "large",
        })
    }
}

/// Dietary record (0..1 per guest)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FoodPreference {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub cuisine_preferences: Option<String>,
    #[serde(default)]
    pub portion_size: PortionSize,
    #[serde(default)]
    pub special_requests: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggested_reference_wins_over_custom_name() {
        let hotel = HotelInfo {
            suggested_hotel_id: Some(HotelId(4)),
            custom_hotel_name: Some("Aunt's place".to_string()),
            ..HotelInfo::default()
        };
        assert_eq!(
            hotel.accommodation(),
            Some(Accommodation::Suggested { hotel_id: HotelId(4) })
        );
    }

    #[test]
    fn blank_custom_name_is_no_accommodation() {
        let hotel = HotelInfo {
            custom_hotel_name: Some("  ".to_string()),
            ..HotelInfo::default()
        };
        assert_eq!(hotel.accommodation(), None);
    }

    #[test]
    fn accommodation_is_tagged() {
        let custom: Accommodation =
            serde_json::from_str(r#"{"kind":"custom","name":"Casa Azul"}"#).unwrap();
        assert_eq!(
            custom,
            Accommodation::Custom {
                name: "Casa Azul".to_string(),
                address: None
            }
        );
    }

    #[test]
    fn dress_code_tolerates_null_palette() {
        let code: DressCode =
            serde_json::from_str(r#"{"id": 1, "color_palette": null, "guest_preference": null}"#)
                .unwrap();
        assert!(code.color_palette.is_empty());
        assert!(code.guest_preference.is_none());
    }
}
