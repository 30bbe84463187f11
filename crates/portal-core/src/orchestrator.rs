//! Write-through mutation orchestrator
//!
//! Every mutation follows the same path:
//!
//! ```text
//! Idle -> Submitting -> Success -> Invalidating -> Idle
//!                    \-> Failed -> Idle
//! ```
//!
//! A successful write is never applied to the cached aggregate directly. The
//! store is refreshed first and the caller only hears back once that refresh
//! has resolved, so completion flags always come from server truth. A failed
//! write leaves the cached data untouched and hands the classified error back;
//! an auth or not-found failure also marks the store's session as ended.
//!
//! A second submit of the same kind while one is in flight is a caller bug.
//! It is logged, not blocked; the store's sequence rule keeps the last issued
//! refresh authoritative.

use crate::error::PortalError;
use crate::evaluator::resolve_activity_registration;
use crate::shaping::{
    shape_dress_preference, shape_food_preference, shape_hotel, shape_rsvp, shape_travel,
    DressPreferenceInput, FoodPreferenceInput, HotelInput, RsvpInput, TravelInput,
};
use crate::store::{PortalStore, RefreshOutcome};
use dashmap::DashMap;
use portal_gateway::{GatewayError, GatewayResult, PortalGateway};
use portal_model::{
    ActivityId, ActivityRegistrationStatus, DressPreference, FoodPreference, Guest, HotelInfo,
    SectionCompletion, TravelInfo,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The six mutation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Rsvp,
    Travel,
    Hotel,
    DressPreference,
    FoodPreference,
    ActivityRegistration,
}

impl MutationKind {
    pub const ALL: [MutationKind; 6] = [
        MutationKind::Rsvp,
        MutationKind::Travel,
        MutationKind::Hotel,
        MutationKind::DressPreference,
        MutationKind::FoodPreference,
        MutationKind::ActivityRegistration,
    ];

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Rsvp => "rsvp",
            MutationKind::Travel => "travel",
            MutationKind::Hotel => "hotel",
            MutationKind::DressPreference => "dress_preference",
            MutationKind::FoodPreference => "food_preference",
            MutationKind::ActivityRegistration => "activity_registration",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a mutation kind currently is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationPhase {
    #[default]
    Idle,
    /// Write sent, no answer yet
    Submitting,
    /// Write confirmed, follow-up refresh outstanding
    Invalidating,
}

/// Tracking record for one mutation kind
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KindStatus {
    pub phase: MutationPhase,
    /// Submissions not yet resolved
    pub in_flight: usize,
    /// Error of the most recent failed submission, cleared by the next success
    pub last_error: Option<GatewayError>,
    /// Successful submissions so far
    pub completed: u64,
}

/// Result of a successful write
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome<T> {
    pub kind: MutationKind,
    /// Sub-record the server confirmed
    pub confirmed: T,
    /// Follow-up refresh result; the write persisted either way
    pub refresh: Result<RefreshOutcome, GatewayError>,
}

impl<T> MutationOutcome<T> {
    /// Whether the store reflects a fetch issued after the write
    #[inline]
    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        self.refresh.is_ok()
    }
}

/// Marks one submission in flight until dropped
struct Submission<'a> {
    kinds: &'a DashMap<MutationKind, KindStatus>,
    kind: MutationKind,
}

impl<'a> Submission<'a> {
    fn begin(kinds: &'a DashMap<MutationKind, KindStatus>, kind: MutationKind) -> Self {
        let mut status = kinds.entry(kind).or_default();
        if status.in_flight > 0 {
            warn!(
                kind = %kind,
                in_flight = status.in_flight,
                "submitting while a previous {kind} mutation is unresolved"
            );
        }
        status.in_flight += 1;
        status.phase = MutationPhase::Submitting;
        Self { kinds, kind }
    }

    fn update(&self, apply: impl FnOnce(&mut KindStatus)) {
        if let Some(mut status) = self.kinds.get_mut(&self.kind) {
            apply(&mut status);
        }
    }
}

impl Drop for Submission<'_> {
    fn drop(&mut self) {
        self.update(|status| {
            status.in_flight = status.in_flight.saturating_sub(1);
            if status.in_flight == 0 {
                status.phase = MutationPhase::Idle;
            }
        });
    }
}

/// Runs shaped writes through the gateway and refreshes the store after each success
pub struct MutationOrchestrator<G: PortalGateway + ?Sized> {
    store: Arc<PortalStore<G>>,
    kinds: DashMap<MutationKind, KindStatus>,
}

impl<G: PortalGateway + ?Sized> fmt::Debug for MutationOrchestrator<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationOrchestrator")
            .field("store", &self.store)
            .field("kinds", &self.kinds)
            .finish()
    }
}

impl<G: PortalGateway + ?Sized> MutationOrchestrator<G> {
    /// Orchestrator writing for the store's current token
    pub fn new(store: Arc<PortalStore<G>>) -> Self {
        Self {
            store,
            kinds: DashMap::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<PortalStore<G>> {
        &self.store
    }

    /// Tracking record for a kind
    #[must_use]
    pub fn status(&self, kind: MutationKind) -> KindStatus {
        self.kinds
            .get(&kind)
            .map(|status| status.clone())
            .unwrap_or_default()
    }

    /// Lifecycle phase of a kind
    #[must_use]
    pub fn phase(&self, kind: MutationKind) -> MutationPhase {
        self.status(kind).phase
    }

    /// Whether any mutation is unresolved
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.kinds.iter().any(|entry| entry.in_flight > 0)
    }

    /// Answer the invitation; a missing attendee count is sent as 1
    pub async fn update_rsvp(&self, input: &RsvpInput) -> Result<MutationOutcome<Guest>, PortalError> {
        let token = self.store.token();
        let payload = shape_rsvp(input);
        debug!(
            token = %token,
            status = %payload.rsvp_status,
            attendees = payload.number_of_attendees,
            "shaped rsvp"
        );
        self.submit(
            MutationKind::Rsvp,
            self.store.gateway().write_rsvp(&token, &payload),
        )
        .await
    }

    /// Replace the travel record
    pub async fn update_travel(
        &self,
        input: &TravelInput,
    ) -> Result<MutationOutcome<TravelInfo>, PortalError> {
        let token = self.store.token();
        let payload = shape_travel(input);
        self.submit(
            MutationKind::Travel,
            self.store.gateway().write_travel(&token, &payload),
        )
        .await
    }

    /// Choose a suggested hotel or describe a custom one
    pub async fn update_hotel_preference(
        &self,
        input: &HotelInput,
    ) -> Result<MutationOutcome<HotelInfo>, PortalError> {
        let token = self.store.token();
        let payload = shape_hotel(input);
        debug!(
            token = %token,
            suggested = ?payload.suggested_hotel_id,
            custom = payload.custom_hotel_name.is_some(),
            "shaped hotel preference"
        );
        self.submit(
            MutationKind::Hotel,
            self.store.gateway().write_hotel(&token, &payload),
        )
        .await
    }

    /// Write the outfit plan for one dress code
    ///
    /// The dress code's palette, when loaded, completes a color given only by
    /// code or only by name.
    pub async fn update_dress_preference(
        &self,
        input: &DressPreferenceInput,
    ) -> Result<MutationOutcome<DressPreference>, PortalError> {
        let token = self.store.token();
        let palette = self
            .store
            .snapshot()
            .and_then(|snapshot| {
                snapshot
                    .aggregate
                    .dress_code(input.dress_code_id)
                    .map(|code| code.color_palette.clone())
            })
            .unwrap_or_default();
        let payload = shape_dress_preference(input, &palette);
        self.submit(
            MutationKind::DressPreference,
            self.store
                .gateway()
                .write_dress_preference(&token, input.dress_code_id, &payload),
        )
        .await
    }

    /// Replace menu, portion and dietary restrictions
    pub async fn update_food_preference(
        &self,
        input: &FoodPreferenceInput,
    ) -> Result<MutationOutcome<FoodPreference>, PortalError> {
        let token = self.store.token();
        let payload = shape_food_preference(input);
        self.submit(
            MutationKind::FoodPreference,
            self.store.gateway().write_food_preference(&token, &payload),
        )
        .await
    }

    /// Register the guest for an activity
    pub async fn register_activity(
        &self,
        activity_id: ActivityId,
    ) -> Result<MutationOutcome<ActivityRegistrationStatus>, PortalError> {
        let token = self.store.token();
        self.submit(
            MutationKind::ActivityRegistration,
            self.store.gateway().register_activity(&token, activity_id),
        )
        .await
    }

    /// Withdraw the guest from an activity
    pub async fn unregister_activity(
        &self,
        activity_id: ActivityId,
    ) -> Result<MutationOutcome<ActivityRegistrationStatus>, PortalError> {
        let token = self.store.token();
        self.submit(
            MutationKind::ActivityRegistration,
            self.store.gateway().unregister_activity(&token, activity_id),
        )
        .await
    }

    /// Flip registration for one activity based on the cached aggregate
    pub async fn toggle_activity(
        &self,
        activity_id: ActivityId,
    ) -> Result<MutationOutcome<ActivityRegistrationStatus>, PortalError> {
        let snapshot = self.store.snapshot().ok_or(PortalError::NotLoaded)?;
        if snapshot.aggregate.activity(activity_id).is_none() {
            return Err(PortalError::UnknownActivity(activity_id));
        }
        if resolve_activity_registration(&snapshot.aggregate, activity_id).is_present() {
            self.unregister_activity(activity_id).await
        } else {
            self.register_activity(activity_id).await
        }
    }

    /// Replace the cached registered-activity list without calling the gateway
    ///
    /// Unlike every other mutation this is a local patch only; the server
    /// keeps its own registrations and the next refresh restores them.
    pub fn set_activity_registrations<I>(&self, ids: I) -> Result<SectionCompletion, PortalError>
    where
        I: IntoIterator<Item = ActivityId>,
    {
        self.store.patch_registered_activities(ids)
    }

    async fn submit<T, F>(&self, kind: MutationKind, write: F) -> Result<MutationOutcome<T>, PortalError>
    where
        F: Future<Output = GatewayResult<T>>,
    {
        let submission = Submission::begin(&self.kinds, kind);

        let confirmed = match write.await {
            Ok(confirmed) => confirmed,
            Err(err) => {
                warn!(
                    kind = %kind,
                    error_kind = %err.kind,
                    status = ?err.status_code,
                    "mutation failed; cached data left untouched"
                );
                submission.update(|status| status.last_error = Some(err.clone()));
                self.store.record_terminal(&err);
                return Err(err.into());
            }
        };

        submission.update(|status| {
            status.phase = MutationPhase::Invalidating;
            status.last_error = None;
        });
        let refresh = self.store.refresh().await;
        match &refresh {
            Ok(outcome) => info!(kind = %kind, sequence = outcome.sequence(), "mutation confirmed"),
            Err(err) => warn!(
                kind = %kind,
                error_kind = %err.kind,
                "mutation confirmed but follow-up refresh failed"
            ),
        }
        submission.update(|status| status.completed += 1);

        Ok(MutationOutcome {
            kind,
            confirmed,
            refresh,
        })
    }
}
