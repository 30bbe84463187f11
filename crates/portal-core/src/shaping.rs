//! Mutation inputs and payload shaping
//!
//! Inputs are what a form layer hands over: partial, possibly padded with
//! blank strings, possibly carrying fields the backend does not accept.
//! They decode from JSON with unknown fields ignored. The `shape_*`
//! functions turn an input into the fixed wire payload and apply the
//! defaulting rules of the booking contract. Shaping never validates.

use chrono::NaiveDate;
use portal_model::de::{lenient_date, null_as_default};
use portal_model::{
    Accommodation, ColorSwatch, DressCodeId, DressPreferencePayload, FoodPreferencePayload,
    HotelId, HotelPayload, PortionSize, RsvpPayload, RsvpStatus, TravelPayload,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Attendee count sent when the caller leaves it out
pub const DEFAULT_ATTENDEES: u32 = 1;
/// Room count sent when the caller leaves it out
pub const DEFAULT_ROOMS: u32 = 1;

/// RSVP form input
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RsvpInput {
    #[serde(default, alias = "status")]
    pub rsvp_status: RsvpStatus,
    #[serde(default)]
    pub number_of_attendees: Option<u32>,
    #[serde(default)]
    pub special_requests: Option<String>,
}

impl RsvpInput {
    #[inline]
    #[must_use]
    pub fn new(rsvp_status: RsvpStatus) -> Self {
        Self {
            rsvp_status,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_attendees(mut self, count: u32) -> Self {
        self.number_of_attendees = Some(count);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_special_requests(mut self, requests: impl Into<String>) -> Self {
        self.special_requests = Some(requests.into());
        self
    }
}

/// Travel form input
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TravelInput {
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

/// Hotel form input
///
/// `accommodation` is the preferred shape. The flat legacy fields are still
/// accepted; when both a suggested id and a custom name arrive, the suggested
/// hotel wins and the custom fields are not sent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HotelInput {
    pub accommodation: Option<Accommodation>,
    pub suggested_hotel_id: Option<HotelId>,
    pub custom_hotel_name: Option<String>,
    pub custom_hotel_address: Option<String>,
    #[serde(with = "lenient_date")]
    pub check_in_date: Option<NaiveDate>,
    #[serde(with = "lenient_date")]
    pub check_out_date: Option<NaiveDate>,
    pub room_type: Option<String>,
    pub number_of_rooms: Option<u32>,
    pub special_requests: Option<String>,
}

impl HotelInput {
    /// Stay at one of the suggested hotels
    #[must_use]
    pub fn suggested(hotel_id: HotelId) -> Self {
        Self {
            accommodation: Some(Accommodation::Suggested { hotel_id }),
            ..Self::default()
        }
    }

    /// Stay somewhere else
    #[must_use]
    pub fn custom(name: impl Into<String>, address: Option<String>) -> Self {
        Self {
            accommodation: Some(Accommodation::Custom {
                name: name.into(),
                address,
            }),
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_dates(mut self, check_in: NaiveDate, check_out: NaiveDate) -> Self {
        self.check_in_date = Some(check_in);
        self.check_out_date = Some(check_out);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_rooms(mut self, count: u32) -> Self {
        self.number_of_rooms = Some(count);
        self
    }

    /// The one accommodation this input names, if any
    #[must_use]
    pub fn resolved_accommodation(&self) -> Option<Accommodation> {
        if let Some(accommodation) = &self.accommodation {
            return Some(accommodation.clone());
        }
        if let Some(hotel_id) = self.suggested_hotel_id {
            return Some(Accommodation::Suggested { hotel_id });
        }
        clean(&self.custom_hotel_name).map(|name| Accommodation::Custom {
            name,
            address: self.custom_hotel_address.clone(),
        })
    }
}

/// Color picked for an outfit, by palette code or by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorChoice {
    Code(String),
    Name(String),
}

/// Dress preference form input for one dress code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DressPreferenceInput {
    pub dress_code_id: DressCodeId,
    #[serde(default)]
    pub planned_outfit: Option<String>,
    #[serde(default)]
    pub color: Option<ColorChoice>,
    #[serde(default)]
    pub color_code: Option<String>,
    #[serde(default)]
    pub color_name: Option<String>,
    #[serde(default)]
    pub needs_shopping_assistance: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

impl DressPreferenceInput {
    #[must_use]
    pub fn new(dress_code_id: DressCodeId) -> Self {
        Self {
            dress_code_id,
            planned_outfit: None,
            color: None,
            color_code: None,
            color_name: None,
            needs_shopping_assistance: false,
            notes: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_outfit(mut self, outfit: impl Into<String>) -> Self {
        self.planned_outfit = Some(outfit.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = Some(color);
        self
    }
}

/// Food preference form input
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FoodPreferenceInput {
    #[serde(deserialize_with = "null_as_default")]
    pub dietary_restrictions: Vec<String>,
    pub allergies: Option<String>,
    pub cuisine_preferences: Option<String>,
    pub portion_size: Option<PortionSize>,
    pub special_requests: Option<String>,
}

/// Shape an RSVP; a missing attendee count becomes [`DEFAULT_ATTENDEES`]
///
/// A declined answer keeps whatever count the caller sent.
#[must_use]
pub fn shape_rsvp(input: &RsvpInput) -> RsvpPayload {
    RsvpPayload {
        rsvp_status: input.rsvp_status,
        number_of_attendees: input.number_of_attendees.unwrap_or(DEFAULT_ATTENDEES),
        special_requests: clean(&input.special_requests),
    }
}

#[must_use]
pub fn shape_travel(input: &TravelInput) -> TravelPayload {
    TravelPayload {
        arrival_date: input.arrival_date,
        arrival_time: clean(&input.arrival_time),
        arrival_flight_number: clean(&input.arrival_flight_number),
        arrival_airport: clean(&input.arrival_airport),
        needs_pickup: input.needs_pickup,
        departure_date: input.departure_date,
        departure_time: clean(&input.departure_time),
        departure_flight_number: clean(&input.departure_flight_number),
        departure_airport: clean(&input.departure_airport),
        needs_dropoff: input.needs_dropoff,
        notes: clean(&input.notes),
    }
}

/// Shape a hotel write with exactly one accommodation branch set
#[must_use]
pub fn shape_hotel(input: &HotelInput) -> HotelPayload {
    let (suggested_hotel_id, custom_hotel_name, custom_hotel_address) =
        match input.resolved_accommodation() {
            Some(Accommodation::Suggested { hotel_id }) => (Some(hotel_id), None, None),
            Some(Accommodation::Custom { name, address }) => {
                (None, clean(&Some(name)), clean(&address))
            }
            None => (None, None, None),
        };
    HotelPayload {
        suggested_hotel_id,
        custom_hotel_name,
        custom_hotel_address,
        check_in_date: input.check_in_date,
        check_out_date: input.check_out_date,
        room_type: clean(&input.room_type),
        number_of_rooms: input.number_of_rooms.unwrap_or(DEFAULT_ROOMS),
        special_requests: clean(&input.special_requests),
    }
}

/// Shape a dress preference, filling the other half of a color from the palette
#[must_use]
pub fn shape_dress_preference(
    input: &DressPreferenceInput,
    palette: &[ColorSwatch],
) -> DressPreferencePayload {
    let (color_code, color_name) = match &input.color {
        Some(ColorChoice::Code(code)) => {
            let code = code.trim().to_string();
            let name = palette
                .iter()
                .find(|swatch| swatch.code.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(&code)))
                .and_then(|swatch| swatch.name.clone());
            (Some(code).filter(|c| !c.is_empty()), name)
        }
        Some(ColorChoice::Name(name)) => {
            let name = name.trim().to_string();
            let code = palette
                .iter()
                .find(|swatch| swatch.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(&name)))
                .and_then(|swatch| swatch.code.clone());
            (code, Some(name).filter(|n| !n.is_empty()))
        }
        None => (clean(&input.color_code), clean(&input.color_name)),
    };
    DressPreferencePayload {
        planned_outfit: clean(&input.planned_outfit),
        color_code,
        color_name,
        needs_shopping_assistance: input.needs_shopping_assistance,
        notes: clean(&input.notes),
    }
}

/// Shape a food preference; restrictions are trimmed, lowercased, sorted and deduplicated
#[must_use]
pub fn shape_food_preference(input: &FoodPreferenceInput) -> FoodPreferencePayload {
    let restrictions: BTreeSet<String> = input
        .dietary_restrictions
        .iter()
        .map(|item| item.trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .collect();
    FoodPreferencePayload {
        dietary_restrictions: restrictions.into_iter().collect(),
        allergies: clean(&input.allergies),
        cuisine_preferences: clean(&input.cuisine_preferences),
        portion_size: input.portion_size.unwrap_or_default(),
        special_requests: clean(&input.special_requests),
    }
}

// Blank strings are sent as null.
#[allow(clippy::ref_option)]
fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn swatch(code: &str, name: &str) -> ColorSwatch {
        ColorSwatch {
            code: Some(code.to_string()),
            name: Some(name.to_string()),
        }
    }

    #[test]
    fn rsvp_attendees_default_to_one() {
        let payload = shape_rsvp(&RsvpInput::new(RsvpStatus::Confirmed));
        assert_eq!(payload.number_of_attendees, 1);
    }

    #[test]
    fn declined_rsvp_keeps_caller_count() {
        let payload = shape_rsvp(&RsvpInput::new(RsvpStatus::Declined).with_attendees(3));
        assert_eq!(payload.number_of_attendees, 3);
    }

    #[test]
    fn rsvp_input_accepts_status_alias_and_drops_extras() {
        let input: RsvpInput = serde_json::from_value(json!({
            "status": "confirmed",
            "number_of_attendees": 2,
            "special_requests": "   ",
            "is_admin": true
        }))
        .unwrap();
        let payload = shape_rsvp(&input);
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"rsvp_status": "confirmed", "number_of_attendees": 2, "special_requests": null})
        );
    }

    #[test]
    fn travel_blank_strings_become_null() {
        let input: TravelInput = serde_json::from_value(json!({
            "arrival_date": "2026-09-10",
            "arrival_flight_number": " LH 123 ",
            "arrival_airport": "",
            "needs_pickup": true,
            "departure_date": ""
        }))
        .unwrap();
        let payload = shape_travel(&input);
        assert_eq!(payload.arrival_date, NaiveDate::from_ymd_opt(2026, 9, 10));
        assert_eq!(payload.arrival_flight_number.as_deref(), Some("LH 123"));
        assert_eq!(payload.arrival_airport, None);
        assert_eq!(payload.departure_date, None);
        assert!(payload.needs_pickup);
    }

    #[test]
    fn suggested_hotel_sends_only_the_id() {
        let payload = shape_hotel(&HotelInput::suggested(HotelId(3)));
        assert_eq!(payload.suggested_hotel_id, Some(HotelId(3)));
        assert_eq!(payload.custom_hotel_name, None);
        assert_eq!(payload.number_of_rooms, DEFAULT_ROOMS);
        let body = serde_json::to_value(&payload).unwrap();
        assert!(body.get("custom_hotel_name").is_none());
    }

    #[test]
    fn custom_hotel_sends_only_name_and_address() {
        let payload = shape_hotel(
            &HotelInput::custom(" Casa Azul ", Some("1 Beach Rd".to_string())).with_rooms(2),
        );
        assert_eq!(payload.suggested_hotel_id, None);
        assert_eq!(payload.custom_hotel_name.as_deref(), Some("Casa Azul"));
        assert_eq!(payload.custom_hotel_address.as_deref(), Some("1 Beach Rd"));
        assert_eq!(payload.number_of_rooms, 2);
    }

    #[test]
    fn flat_hotel_fields_with_both_branches_prefer_suggested() {
        let input: HotelInput = serde_json::from_value(json!({
            "suggested_hotel_id": 8,
            "custom_hotel_name": "Aunt's place",
            "custom_hotel_address": "Elm St"
        }))
        .unwrap();
        let payload = shape_hotel(&input);
        assert_eq!(payload.suggested_hotel_id, Some(HotelId(8)));
        assert_eq!(payload.custom_hotel_name, None);
        assert_eq!(payload.custom_hotel_address, None);
    }

    #[test]
    fn hotel_without_accommodation_sends_neither_branch() {
        let payload = shape_hotel(&HotelInput::default());
        assert_eq!(payload.suggested_hotel_id, None);
        assert_eq!(payload.custom_hotel_name, None);
    }

    #[test]
    fn color_code_fills_name_from_palette() {
        let palette = [swatch("#0B3D2E", "Emerald"), swatch("#1C2541", "Navy")];
        let input = DressPreferenceInput::new(DressCodeId(1))
            .with_outfit("Gown")
            .with_color(ColorChoice::Code("#1c2541".to_string()));
        let payload = shape_dress_preference(&input, &palette);
        assert_eq!(payload.color_code.as_deref(), Some("#1c2541"));
        assert_eq!(payload.color_name.as_deref(), Some("Navy"));
    }

    #[test]
    fn color_name_fills_code_from_palette() {
        let palette = [swatch("#0B3D2E", "Emerald")];
        let input = DressPreferenceInput::new(DressCodeId(1))
            .with_color(ColorChoice::Name("emerald".to_string()));
        let payload = shape_dress_preference(&input, &palette);
        assert_eq!(payload.color_code.as_deref(), Some("#0B3D2E"));
        assert_eq!(payload.color_name.as_deref(), Some("emerald"));
    }

    #[test]
    fn off_palette_color_is_sent_as_is() {
        let input: DressPreferenceInput = serde_json::from_value(json!({
            "dress_code_id": 2,
            "color_code": "#FFFFFF",
            "dress_code_name": "ignored"
        }))
        .unwrap();
        let payload = shape_dress_preference(&input, &[]);
        assert_eq!(payload.color_code.as_deref(), Some("#FFFFFF"));
        assert_eq!(payload.color_name, None);
    }

    #[test]
    fn food_restrictions_are_normalized() {
        let input: FoodPreferenceInput = serde_json::from_value(json!({
            "dietary_restrictions": [" Vegan", "gluten-free", "vegan", ""],
            "portion_size": "large",
            "allergies": "peanuts"
        }))
        .unwrap();
        let payload = shape_food_preference(&input);
        assert_eq!(payload.dietary_restrictions, vec!["gluten-free", "vegan"]);
        assert_eq!(payload.portion_size, PortionSize::Large);
        assert_eq!(payload.allergies.as_deref(), Some("peanuts"));
    }

    #[test]
    fn food_defaults_to_regular_portion() {
        let input: FoodPreferenceInput =
            serde_json::from_value(json!({"dietary_restrictions": null})).unwrap();
        let payload = shape_food_preference(&input);
        assert!(payload.dietary_restrictions.is_empty());
        assert_eq!(payload.portion_size, PortionSize::Regular);
    }
}
