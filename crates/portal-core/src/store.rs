//! Portal state store
//!
//! One store per guest session. It owns the cached aggregate for exactly one
//! token and only ever replaces it with the result of the most recently
//! *issued* fetch. Every fetch takes the next sequence number; a result is
//! applied only when its sequence is newer than anything already resolved
//! (successfully or not) and the token has not changed in the meantime.
//! Late results of superseded fetches are dropped.
//!
//! State changes are fanned out through a `watch` channel so a renderer can
//! follow the store without polling.

use crate::error::PortalError;
use crate::evaluator::evaluate_completion;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use portal_gateway::{GatewayError, PortalGateway};
use portal_model::{ActivityId, AggregateRecord, GuestToken, SectionCompletion};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Fetched aggregate plus everything derived from it
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub aggregate: AggregateRecord,
    pub completion: SectionCompletion,
    /// Sequence of the fetch that produced the aggregate
    pub sequence: u64,
    pub fetched_at: DateTime<Utc>,
    /// Set once the cached aggregate diverges from server truth via a local patch
    pub locally_patched: bool,
}

/// Coarse load state for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// No fetch has resolved yet
    NeverLoaded,
    /// Data is present and the last fetch succeeded
    Ready,
    /// Data is present but the last fetch failed
    Stale,
    /// No data and the last fetch failed
    Failed,
}

impl LoadState {
    /// Whether there is an aggregate to show
    #[inline]
    #[must_use]
    pub fn has_data(&self) -> bool {
        matches!(self, LoadState::Ready | LoadState::Stale)
    }
}

/// Result of a refresh that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The fetch result replaced the cached aggregate
    Applied { sequence: u64 },
    /// A newer fetch (or a token switch) won; the result was dropped
    Superseded { sequence: u64 },
}

impl RefreshOutcome {
    #[inline]
    #[must_use]
    pub fn sequence(&self) -> u64 {
        match self {
            RefreshOutcome::Applied { sequence } | RefreshOutcome::Superseded { sequence } => {
                *sequence
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, RefreshOutcome::Applied { .. })
    }
}

/// Point-in-time view of the store, published on every change
#[derive(Debug, Clone, PartialEq)]
pub struct PortalView {
    pub token: GuestToken,
    pub status: LoadState,
    pub is_loading: bool,
    pub snapshot: Option<Arc<Snapshot>>,
    pub error: Option<GatewayError>,
}

impl PortalView {
    #[inline]
    #[must_use]
    pub fn completion(&self) -> Option<SectionCompletion> {
        self.snapshot.as_ref().map(|snapshot| snapshot.completion)
    }
}

#[derive(Debug)]
struct StoreState {
    token: GuestToken,
    /// Highest sequence handed out
    issued: u64,
    /// Highest sequence whose result was applied or that was invalidated
    resolved: u64,
    in_flight: BTreeSet<u64>,
    snapshot: Option<Arc<Snapshot>>,
    error: Option<GatewayError>,
}

impl StoreState {
    fn new(token: GuestToken) -> Self {
        Self {
            token,
            issued: 0,
            resolved: 0,
            in_flight: BTreeSet::new(),
            snapshot: None,
            error: None,
        }
    }

    fn status(&self) -> LoadState {
        match (&self.snapshot, &self.error) {
            (None, None) => LoadState::NeverLoaded,
            (Some(_), None) => LoadState::Ready,
            (Some(_), Some(_)) => LoadState::Stale,
            (None, Some(_)) => LoadState::Failed,
        }
    }

    fn view(&self) -> PortalView {
        PortalView {
            token: self.token.clone(),
            status: self.status(),
            is_loading: !self.in_flight.is_empty(),
            snapshot: self.snapshot.clone(),
            error: self.error.clone(),
        }
    }
}

/// Cached aggregate and derived completion for one guest session
pub struct PortalStore<G: PortalGateway + ?Sized> {
    gateway: Arc<G>,
    state: Mutex<StoreState>,
    views: watch::Sender<PortalView>,
}

impl<G: PortalGateway + ?Sized> std::fmt::Debug for PortalStore<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalStore")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

/// Clears a fetch's in-flight marker if its future is dropped before resolving
struct InFlight<'a, G: PortalGateway + ?Sized> {
    store: &'a PortalStore<G>,
    sequence: u64,
    armed: bool,
}

impl<G: PortalGateway + ?Sized> Drop for InFlight<'_, G> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.store.state.lock();
        if state.in_flight.remove(&self.sequence) {
            self.store.publish(&state);
        }
    }
}

impl<G: PortalGateway + ?Sized> PortalStore<G> {
    /// Create an empty store for a token; nothing is fetched until [`Self::refresh`]
    pub fn new(gateway: Arc<G>, token: GuestToken) -> Self {
        let state = StoreState::new(token);
        let (views, _) = watch::channel(state.view());
        Self {
            gateway,
            state: Mutex::new(state),
            views,
        }
    }

    /// Gateway this store reads through
    #[inline]
    #[must_use]
    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// Token the store currently serves
    #[must_use]
    pub fn token(&self) -> GuestToken {
        self.state.lock().token.clone()
    }

    /// Fetch the aggregate and apply it unless a newer fetch has resolved
    ///
    /// Safe to call concurrently. A failure that is still current keeps the
    /// cached aggregate and records the error; a failure of a superseded
    /// fetch is dropped like any other superseded result.
    pub async fn refresh(&self) -> Result<RefreshOutcome, GatewayError> {
        let (token, sequence) = {
            let mut state = self.state.lock();
            state.issued += 1;
            let sequence = state.issued;
            state.in_flight.insert(sequence);
            self.publish(&state);
            (state.token.clone(), sequence)
        };
        let mut guard = InFlight {
            store: self,
            sequence,
            armed: true,
        };
        debug!(token = %token, sequence, "issuing aggregate fetch");

        let result = self.gateway.fetch_aggregate(&token).await;

        let mut state = self.state.lock();
        state.in_flight.remove(&sequence);
        guard.armed = false;

        if sequence <= state.resolved || state.token != token {
            debug!(
                token = %token,
                sequence,
                resolved = state.resolved,
                "dropping superseded fetch result"
            );
            self.publish(&state);
            return Ok(RefreshOutcome::Superseded { sequence });
        }
        state.resolved = sequence;

        match result {
            Ok(aggregate) => {
                let completion = evaluate_completion(&aggregate);
                info!(
                    token = %token,
                    sequence,
                    completed = completion.completed_count(),
                    "applied aggregate"
                );
                state.snapshot = Some(Arc::new(Snapshot {
                    aggregate,
                    completion,
                    sequence,
                    fetched_at: Utc::now(),
                    locally_patched: false,
                }));
                state.error = None;
                self.publish(&state);
                Ok(RefreshOutcome::Applied { sequence })
            }
            Err(err) => {
                warn!(
                    token = %token,
                    sequence,
                    kind = %err.kind,
                    retained = state.snapshot.is_some(),
                    "aggregate fetch failed"
                );
                state.error = Some(err.clone());
                self.publish(&state);
                Err(err)
            }
        }
    }

    /// Serve a different token: drop everything cached, then fetch
    pub async fn switch_token(&self, token: GuestToken) -> Result<RefreshOutcome, GatewayError> {
        {
            let mut state = self.state.lock();
            if state.token != token {
                info!(from = %state.token, to = %token, "switching guest token");
                state.token = token;
                state.snapshot = None;
                state.error = None;
                state.resolved = state.issued;
                state.in_flight.clear();
                self.publish(&state);
            }
        }
        self.refresh().await
    }

    /// Mark the session as ended by a terminal error observed outside a fetch
    ///
    /// The cached aggregate and completion are kept; only the error is
    /// recorded, so [`Self::session_invalid`] reports true. Fetches issued
    /// before this call can no longer clear it. Non-terminal errors are
    /// ignored and `false` is returned.
    pub fn record_terminal(&self, err: &GatewayError) -> bool {
        if !err.is_terminal() {
            return false;
        }
        let mut state = self.state.lock();
        warn!(token = %state.token, kind = %err.kind, "session ended by write failure");
        state.resolved = state.issued;
        state.error = Some(err.clone());
        self.publish(&state);
        true
    }

    /// Rewrite the cached guest's registered activity ids without a gateway call
    ///
    /// Completion is recomputed from the patched aggregate in full. The next
    /// applied fetch replaces the patch with server truth.
    pub fn patch_registered_activities<I>(&self, ids: I) -> Result<SectionCompletion, PortalError>
    where
        I: IntoIterator<Item = ActivityId>,
    {
        let mut state = self.state.lock();
        let current = state.snapshot.as_ref().ok_or(PortalError::NotLoaded)?;

        let mut seen = BTreeSet::new();
        let ids: Vec<ActivityId> = ids.into_iter().filter(|id| seen.insert(*id)).collect();

        let mut aggregate = current.aggregate.clone();
        aggregate.guest.registered_activities = Some(ids);
        let completion = evaluate_completion(&aggregate);
        let patched = Snapshot {
            aggregate,
            completion,
            sequence: current.sequence,
            fetched_at: current.fetched_at,
            locally_patched: true,
        };
        warn!(
            token = %state.token,
            sequence = patched.sequence,
            "patched registered activities locally; server not updated"
        );
        state.snapshot = Some(Arc::new(patched));
        self.publish(&state);
        Ok(completion)
    }

    /// Latest applied snapshot
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.state.lock().snapshot.clone()
    }

    /// Cached aggregate, if any
    #[must_use]
    pub fn aggregate(&self) -> Option<AggregateRecord> {
        self.snapshot().map(|snapshot| snapshot.aggregate.clone())
    }

    /// Completion flags of the cached aggregate, if any
    #[must_use]
    pub fn completion(&self) -> Option<SectionCompletion> {
        self.state.lock().snapshot.as_ref().map(|s| s.completion)
    }

    /// Error of the most recent current fetch or terminal write, cleared by the next success
    #[must_use]
    pub fn error(&self) -> Option<GatewayError> {
        self.state.lock().error.clone()
    }

    /// Whether any fetch is outstanding
    #[must_use]
    pub fn is_loading(&self) -> bool {
        !self.state.lock().in_flight.is_empty()
    }

    #[must_use]
    pub fn status(&self) -> LoadState {
        self.state.lock().status()
    }

    /// Whether the last error ended the session (auth or unknown token)
    #[must_use]
    pub fn session_invalid(&self) -> bool {
        self.state
            .lock()
            .error
            .as_ref()
            .is_some_and(GatewayError::is_terminal)
    }

    #[must_use]
    pub fn view(&self) -> PortalView {
        self.state.lock().view()
    }

    /// Receiver that observes every published view
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PortalView> {
        self.views.subscribe()
    }

    // Called with the state lock held so views are published in order.
    fn publish(&self, state: &StoreState) {
        self.views.send_replace(state.view());
    }
}
