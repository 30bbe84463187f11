//! The gateway seam between the portal engine and its source of truth

use crate::error::GatewayResult;
use async_trait::async_trait;
use portal_model::{
    ActivityId, ActivityRegistrationStatus, AggregateRecord, DressCodeId, DressPreference,
    DressPreferencePayload, FoodPreference, FoodPreferencePayload, Guest, GuestToken, HotelInfo,
    HotelPayload, RsvpPayload, TravelInfo, TravelPayload,
};

/// Typed reads and writes against the guest-portal backend.
///
/// Writes return the narrow server-confirmed sub-record, never the full
/// aggregate. Every failure arrives already classified.
#[async_trait]
pub trait PortalGateway: Send + Sync {
    /// Fetch the complete aggregate for a guest token
    async fn fetch_aggregate(&self, token: &GuestToken) -> GatewayResult<AggregateRecord>;

    /// Store the RSVP answer
    async fn write_rsvp(&self, token: &GuestToken, payload: &RsvpPayload) -> GatewayResult<Guest>;

    /// Replace the travel record
    async fn write_travel(
        &self,
        token: &GuestToken,
        payload: &TravelPayload,
    ) -> GatewayResult<TravelInfo>;

    /// Replace the lodging record
    async fn write_hotel(
        &self,
        token: &GuestToken,
        payload: &HotelPayload,
    ) -> GatewayResult<HotelInfo>;

    /// Store the outfit plan for one dress code
    async fn write_dress_preference(
        &self,
        token: &GuestToken,
        dress_code_id: DressCodeId,
        payload: &DressPreferencePayload,
    ) -> GatewayResult<DressPreference>;

    /// Replace the dietary record
    async fn write_food_preference(
        &self,
        token: &GuestToken,
        payload: &FoodPreferencePayload,
    ) -> GatewayResult<FoodPreference>;

    /// Join one activity
    async fn register_activity(
        &self,
        token: &GuestToken,
        activity_id: ActivityId,
    ) -> GatewayResult<ActivityRegistrationStatus>;

    /// Leave one activity
    async fn unregister_activity(
        &self,
        token: &GuestToken,
        activity_id: ActivityId,
    ) -> GatewayResult<ActivityRegistrationStatus>;
}
