//! Testing utilities for the guest portal workspace
//!
//! Shared fixtures and a scripted in-memory gateway.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use portal_gateway::{GatewayError, GatewayResult, PortalGateway};
use portal_model::{
    ActivityId, ActivityRegistrationStatus, AggregateRecord, DressCodeId, DressPreference,
    DressPreferencePayload, FoodPreference, FoodPreferencePayload, Guest, GuestToken, HotelInfo,
    HotelPayload, RsvpPayload, TravelInfo, TravelPayload,
};
use std::collections::{HashMap, VecDeque};
use tokio::sync::oneshot;

pub mod fixtures {
    use chrono::NaiveDate;
    use portal_model::{
        Activity, ActivityId, AggregateRecord, ColorSwatch, DressCode, DressCodeId,
        DressPreference, FoodPreference, Guest, GuestToken, HotelId, HotelInfo, PortionSize,
        RsvpStatus, SuggestedHotel, TravelInfo, Wedding,
    };

    pub const TOKEN: &str = "AB12CD34";

    pub fn token() -> GuestToken {
        GuestToken::new(TOKEN)
    }

    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    pub fn guest() -> Guest {
        Guest {
            id: 7,
            first_name: "Lea".to_string(),
            last_name: "Moreau".to_string(),
            email: Some("lea@example.com".to_string()),
            phone: None,
            rsvp_status: RsvpStatus::Pending,
            number_of_attendees: 1,
            special_requests: None,
            registered_activities: None,
        }
    }

    pub fn wedding() -> Wedding {
        Wedding {
            id: 1,
            bride_name: "Mia".to_string(),
            groom_name: "Leo".to_string(),
            wedding_date: Some(date(2026, 9, 12)),
            venue_name: Some("Villa Rosa".to_string()),
            ..Wedding::default()
        }
    }

    pub fn dress_code(id: i64) -> DressCode {
        DressCode {
            id: DressCodeId(id),
            event_name: format!("Event {id}"),
            description: Some("Garden formal".to_string()),
            dress_code_type: Some("formal".to_string()),
            color_palette: vec![
                ColorSwatch {
                    code: Some("#9CAF88".to_string()),
                    name: Some("Sage".to_string()),
                },
                ColorSwatch {
                    code: Some("#1C2541".to_string()),
                    name: Some("Navy".to_string()),
                },
            ],
            guest_preference: None,
        }
    }

    pub fn activity(id: i64, is_registered: Option<bool>) -> Activity {
        Activity {
            id: ActivityId(id),
            name: format!("Activity {id}"),
            description: None,
            date: Some(date(2026, 9, 11)),
            time: Some("10:00".to_string()),
            location: Some("Harbour".to_string()),
            capacity: Some(20),
            is_registered,
        }
    }

    pub fn suggested_hotel(id: i64) -> SuggestedHotel {
        SuggestedHotel {
            id: HotelId(id),
            name: format!("Hotel {id}"),
            address: Some("Seafront 1".to_string()),
            website: None,
            phone: None,
            price_range: Some("$$".to_string()),
            distance_from_venue: Some("2 km".to_string()),
            notes: None,
        }
    }

    /// Guest who has not filled in anything yet
    pub fn pending_aggregate() -> AggregateRecord {
        let mut aggregate = AggregateRecord::for_guest(guest());
        aggregate.wedding = wedding();
        aggregate.suggested_hotels = vec![suggested_hotel(2)];
        aggregate
    }

    /// Guest with every section filled in
    pub fn complete_aggregate() -> AggregateRecord {
        let mut aggregate = pending_aggregate();
        aggregate.guest.rsvp_status = RsvpStatus::Confirmed;
        aggregate.guest.number_of_attendees = 2;
        aggregate.travel_info = Some(TravelInfo {
            id: Some(1),
            arrival_date: Some(date(2026, 9, 10)),
            needs_pickup: true,
            ..TravelInfo::default()
        });
        aggregate.hotel_info = Some(HotelInfo {
            id: Some(1),
            suggested_hotel_id: Some(HotelId(2)),
            number_of_rooms: Some(1),
            ..HotelInfo::default()
        });
        let mut code = dress_code(1);
        code.guest_preference = Some(DressPreference {
            id: Some(1),
            dress_code_id: Some(DressCodeId(1)),
            planned_outfit: Some("Linen suit".to_string()),
            ..DressPreference::default()
        });
        aggregate.dress_codes = vec![code];
        aggregate.food_preference = Some(FoodPreference {
            id: Some(1),
            dietary_restrictions: vec!["vegetarian".to_string()],
            portion_size: PortionSize::Regular,
            ..FoodPreference::default()
        });
        aggregate.activities = vec![activity(5, Some(true))];
        aggregate
    }
}

/// Gateway operation, for scripting failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Fetch,
    Rsvp,
    Travel,
    Hotel,
    DressPreference,
    FoodPreference,
    Register,
    Unregister,
}

/// One recorded gateway call
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Fetch(GuestToken),
    Rsvp(GuestToken, RsvpPayload),
    Travel(GuestToken, TravelPayload),
    Hotel(GuestToken, HotelPayload),
    DressPreference(GuestToken, DressCodeId, DressPreferencePayload),
    FoodPreference(GuestToken, FoodPreferencePayload),
    Register(GuestToken, ActivityId),
    Unregister(GuestToken, ActivityId),
}

impl GatewayCall {
    pub fn operation(&self) -> Operation {
        match self {
            GatewayCall::Fetch(_) => Operation::Fetch,
            GatewayCall::Rsvp(..) => Operation::Rsvp,
            GatewayCall::Travel(..) => Operation::Travel,
            GatewayCall::Hotel(..) => Operation::Hotel,
            GatewayCall::DressPreference(..) => Operation::DressPreference,
            GatewayCall::FoodPreference(..) => Operation::FoodPreference,
            GatewayCall::Register(..) => Operation::Register,
            GatewayCall::Unregister(..) => Operation::Unregister,
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, GatewayCall::Fetch(_))
    }
}

#[derive(Debug)]
struct PendingHold {
    started: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

/// Handle on a fetch that stays unresolved until released
///
/// The fetch reads server state when it is issued, so writes made while it
/// is held are not part of its result.
#[derive(Debug)]
pub struct FetchHold {
    started: Option<oneshot::Receiver<()>>,
    release: oneshot::Sender<()>,
}

impl FetchHold {
    /// Wait until the held fetch has been issued
    pub async fn wait_until_issued(&mut self) {
        if let Some(started) = self.started.take() {
            let _ = started.await;
        }
    }

    /// Let the held fetch resolve
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

#[derive(Debug, Default)]
struct Script {
    guests: HashMap<GuestToken, AggregateRecord>,
    failures: HashMap<Operation, VecDeque<GatewayError>>,
    holds: VecDeque<PendingHold>,
    calls: Vec<GatewayCall>,
}

impl Script {
    fn take_failure(&mut self, operation: Operation) -> Option<GatewayError> {
        self.failures.get_mut(&operation).and_then(VecDeque::pop_front)
    }
}

/// In-memory gateway that keeps server truth and applies writes to it
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    script: Mutex<Script>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_guest(token: GuestToken, aggregate: AggregateRecord) -> Self {
        Self::new().and_guest(token, aggregate)
    }

    #[must_use]
    pub fn and_guest(self, token: GuestToken, aggregate: AggregateRecord) -> Self {
        self.script.lock().guests.insert(token, aggregate);
        self
    }

    /// Change server truth directly, bypassing the call log
    pub fn update_guest(&self, token: &GuestToken, apply: impl FnOnce(&mut AggregateRecord)) {
        if let Some(aggregate) = self.script.lock().guests.get_mut(token) {
            apply(aggregate);
        }
    }

    pub fn server_state(&self, token: &GuestToken) -> Option<AggregateRecord> {
        self.script.lock().guests.get(token).cloned()
    }

    /// Fail the next call of an operation with `err`
    pub fn fail_next(&self, operation: Operation, err: GatewayError) {
        self.script
            .lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(err);
    }

    /// Hold the next fetch until the returned handle is released
    pub fn hold_next_fetch(&self) -> FetchHold {
        let (started_tx, started_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        self.script.lock().holds.push_back(PendingHold {
            started: started_tx,
            release: release_rx,
        });
        FetchHold {
            started: Some(started_rx),
            release: release_tx,
        }
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.script.lock().calls.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.count(|call| !call.is_write())
    }

    pub fn write_count(&self) -> usize {
        self.count(GatewayCall::is_write)
    }

    fn count(&self, predicate: impl Fn(&GatewayCall) -> bool) -> usize {
        self.script.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    fn write<T>(
        &self,
        call: GatewayCall,
        apply: impl FnOnce(&mut AggregateRecord) -> GatewayResult<T>,
    ) -> GatewayResult<T> {
        let operation = call.operation();
        let token = match &call {
            GatewayCall::Fetch(token)
            | GatewayCall::Rsvp(token, _)
            | GatewayCall::Travel(token, _)
            | GatewayCall::Hotel(token, _)
            | GatewayCall::DressPreference(token, _, _)
            | GatewayCall::FoodPreference(token, _)
            | GatewayCall::Register(token, _)
            | GatewayCall::Unregister(token, _) => token.clone(),
        };
        let mut script = self.script.lock();
        script.calls.push(call);
        if let Some(err) = script.take_failure(operation) {
            return Err(err);
        }
        let aggregate = script
            .guests
            .get_mut(&token)
            .ok_or_else(|| GatewayError::not_found("Guest not found"))?;
        apply(aggregate)
    }
}

#[async_trait]
impl PortalGateway for ScriptedGateway {
    async fn fetch_aggregate(&self, token: &GuestToken) -> GatewayResult<AggregateRecord> {
        let (result, hold) = {
            let mut script = self.script.lock();
            script.calls.push(GatewayCall::Fetch(token.clone()));
            let hold = script.holds.pop_front();
            let result = match script.take_failure(Operation::Fetch) {
                Some(err) => Err(err),
                None => script
                    .guests
                    .get(token)
                    .cloned()
                    .ok_or_else(|| GatewayError::not_found("Guest not found")),
            };
            (result, hold)
        };
        if let Some(hold) = hold {
            let _ = hold.started.send(());
            let _ = hold.release.await;
        }
        result
    }

    async fn write_rsvp(&self, token: &GuestToken, payload: &RsvpPayload) -> GatewayResult<Guest> {
        self.write(GatewayCall::Rsvp(token.clone(), payload.clone()), |aggregate| {
            let guest = &mut aggregate.guest;
            guest.rsvp_status = payload.rsvp_status;
            guest.number_of_attendees = payload.number_of_attendees;
            guest.special_requests.clone_from(&payload.special_requests);
            Ok(guest.clone())
        })
    }

    async fn write_travel(
        &self,
        token: &GuestToken,
        payload: &TravelPayload,
    ) -> GatewayResult<TravelInfo> {
        self.write(GatewayCall::Travel(token.clone(), payload.clone()), |aggregate| {
            let travel = TravelInfo {
                id: Some(aggregate.travel_info.as_ref().and_then(|t| t.id).unwrap_or(1)),
                arrival_date: payload.arrival_date,
                arrival_time: payload.arrival_time.clone(),
                arrival_flight_number: payload.arrival_flight_number.clone(),
                arrival_airport: payload.arrival_airport.clone(),
                needs_pickup: payload.needs_pickup,
                departure_date: payload.departure_date,
                departure_time: payload.departure_time.clone(),
                departure_flight_number: payload.departure_flight_number.clone(),
                departure_airport: payload.departure_airport.clone(),
                needs_dropoff: payload.needs_dropoff,
                notes: payload.notes.clone(),
            };
            aggregate.travel_info = Some(travel.clone());
            Ok(travel)
        })
    }

    async fn write_hotel(
        &self,
        token: &GuestToken,
        payload: &HotelPayload,
    ) -> GatewayResult<HotelInfo> {
        self.write(GatewayCall::Hotel(token.clone(), payload.clone()), |aggregate| {
            let hotel = HotelInfo {
                id: Some(aggregate.hotel_info.as_ref().and_then(|h| h.id).unwrap_or(1)),
                suggested_hotel_id: payload.suggested_hotel_id,
                custom_hotel_name: payload.custom_hotel_name.clone(),
                custom_hotel_address: payload.custom_hotel_address.clone(),
                check_in_date: payload.check_in_date,
                check_out_date: payload.check_out_date,
                room_type: payload.room_type.clone(),
                number_of_rooms: Some(payload.number_of_rooms),
                special_requests: payload.special_requests.clone(),
            };
            aggregate.hotel_info = Some(hotel.clone());
            Ok(hotel)
        })
    }

    async fn write_dress_preference(
        &self,
        token: &GuestToken,
        dress_code_id: DressCodeId,
        payload: &DressPreferencePayload,
    ) -> GatewayResult<DressPreference> {
        let call = GatewayCall::DressPreference(token.clone(), dress_code_id, payload.clone());
        self.write(call, |aggregate| {
            let code = aggregate
                .dress_codes
                .iter_mut()
                .find(|code| code.id == dress_code_id)
                .ok_or_else(|| GatewayError::not_found("Dress code not found"))?;
            let preference = DressPreference {
                id: Some(dress_code_id.0),
                dress_code_id: Some(dress_code_id),
                planned_outfit: payload.planned_outfit.clone(),
                color_code: payload.color_code.clone(),
                color_name: payload.color_name.clone(),
                needs_shopping_assistance: payload.needs_shopping_assistance,
                notes: payload.notes.clone(),
            };
            code.guest_preference = Some(preference.clone());
            Ok(preference)
        })
    }

    async fn write_food_preference(
        &self,
        token: &GuestToken,
        payload: &FoodPreferencePayload,
    ) -> GatewayResult<FoodPreference> {
        self.write(GatewayCall::FoodPreference(token.clone(), payload.clone()), |aggregate| {
            let food = FoodPreference {
                id: Some(1),
                dietary_restrictions: payload.dietary_restrictions.clone(),
                allergies: payload.allergies.clone(),
                cuisine_preferences: payload.cuisine_preferences.clone(),
                portion_size: payload.portion_size,
                special_requests: payload.special_requests.clone(),
            };
            aggregate.food_preference = Some(food.clone());
            Ok(food)
        })
    }

    async fn register_activity(
        &self,
        token: &GuestToken,
        activity_id: ActivityId,
    ) -> GatewayResult<ActivityRegistrationStatus> {
        self.write(GatewayCall::Register(token.clone(), activity_id), |aggregate| {
            set_registration(aggregate, activity_id, true)
        })
    }

    async fn unregister_activity(
        &self,
        token: &GuestToken,
        activity_id: ActivityId,
    ) -> GatewayResult<ActivityRegistrationStatus> {
        self.write(GatewayCall::Unregister(token.clone(), activity_id), |aggregate| {
            set_registration(aggregate, activity_id, false)
        })
    }
}

fn set_registration(
    aggregate: &mut AggregateRecord,
    activity_id: ActivityId,
    registered: bool,
) -> GatewayResult<ActivityRegistrationStatus> {
    let activity = aggregate
        .activities
        .iter_mut()
        .find(|activity| activity.id == activity_id)
        .ok_or_else(|| GatewayError::not_found("Activity not found"))?;
    activity.is_registered = Some(registered);
    if !registered {
        if let Some(ids) = aggregate.guest.registered_activities.as_mut() {
            ids.retain(|id| *id != activity_id);
        }
        aggregate
            .activity_registrations
            .retain(|row| row.activity_id != activity_id);
    }
    Ok(ActivityRegistrationStatus {
        activity_id,
        is_registered: registered,
    })
}
