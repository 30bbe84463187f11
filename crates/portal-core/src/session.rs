//! Per-token guest sessions
//!
//! A session is the store and orchestrator built once for one guest token.
//! Sessions live in a `moka` cache keyed by token, so two tokens never share
//! an aggregate and idle sessions are evicted on their own. A cached session
//! is only handed out while its store still serves the token it is keyed
//! under and has not been ended by an auth or not-found error; otherwise it
//! is evicted on lookup and the caller gets a fresh one.

use crate::config::PortalConfig;
use crate::error::PortalError;
use crate::orchestrator::MutationOrchestrator;
use crate::store::PortalStore;
use moka::future::Cache;
use portal_gateway::PortalGateway;
use portal_model::GuestToken;
use std::sync::Arc;
use tracing::{debug, info};

/// Store plus orchestrator for one guest
pub struct PortalSession<G: PortalGateway + ?Sized> {
    store: Arc<PortalStore<G>>,
    orchestrator: MutationOrchestrator<G>,
}

impl<G: PortalGateway + ?Sized> std::fmt::Debug for PortalSession<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalSession")
            .field("orchestrator", &self.orchestrator)
            .finish()
    }
}

impl<G: PortalGateway + ?Sized> PortalSession<G> {
    pub fn new(gateway: Arc<G>, token: GuestToken) -> Self {
        let store = Arc::new(PortalStore::new(gateway, token));
        let orchestrator = MutationOrchestrator::new(Arc::clone(&store));
        Self {
            store,
            orchestrator,
        }
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<PortalStore<G>> {
        &self.store
    }

    #[inline]
    #[must_use]
    pub fn orchestrator(&self) -> &MutationOrchestrator<G> {
        &self.orchestrator
    }
}

/// Session cache keyed by guest token
pub struct SessionRegistry<G: PortalGateway + ?Sized + 'static> {
    gateway: Arc<G>,
    sessions: Cache<GuestToken, Arc<PortalSession<G>>>,
}

impl<G: PortalGateway + ?Sized + 'static> SessionRegistry<G> {
    /// Create a registry bounded by the configured capacity and idle lifetime
    pub fn new(gateway: Arc<G>, config: &PortalConfig) -> Self {
        Self {
            gateway,
            sessions: Cache::builder()
                .max_capacity(config.max_sessions)
                .time_to_idle(config.session_ttl())
                .build(),
        }
    }

    /// Existing session for a token, or a fresh unloaded one
    pub async fn get_or_create(&self, token: &GuestToken) -> Arc<PortalSession<G>> {
        if let Some(session) = self.sessions.get(token).await {
            if self.retain(token, &session).await {
                return session;
            }
        }
        let gateway = Arc::clone(&self.gateway);
        let key = token.clone();
        self.sessions
            .get_with(token.clone(), async move {
                debug!(token = %key, "creating guest session");
                Arc::new(PortalSession::new(gateway, key))
            })
            .await
    }

    /// Session with a freshly fetched aggregate
    ///
    /// A terminal failure (unknown token, rejected credential) drops the
    /// session before the error is returned.
    pub async fn open(&self, token: &GuestToken) -> Result<Arc<PortalSession<G>>, PortalError> {
        let session = self.get_or_create(token).await;
        match session.store().refresh().await {
            Ok(_) => Ok(session),
            Err(err) => {
                if err.is_terminal() {
                    info!(token = %token, kind = %err.kind, "ending invalid guest session");
                    self.sessions.invalidate(token).await;
                }
                Err(err.into())
            }
        }
    }

    /// Session for a token, if cached and still serving it
    pub async fn get(&self, token: &GuestToken) -> Option<Arc<PortalSession<G>>> {
        let session = self.sessions.get(token).await?;
        self.retain(token, &session).await.then_some(session)
    }

    /// Drop a session
    pub async fn end(&self, token: &GuestToken) {
        self.sessions.invalidate(token).await;
        debug!(token = %token, "ended guest session");
    }

    /// Number of live sessions after pending evictions ran
    pub async fn len(&self) -> u64 {
        self.sessions.run_pending_tasks().await;
        self.sessions.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    // Evicts the entry under `token` when its store moved to another token or the session ended.
    async fn retain(&self, token: &GuestToken, session: &PortalSession<G>) -> bool {
        let store = session.store();
        let serving = store.token();
        if serving != *token {
            info!(token = %token, serving = %serving, "evicting session switched to another token");
        } else if store.session_invalid() {
            info!(token = %token, "evicting ended guest session");
        } else {
            return true;
        }
        self.sessions.invalidate(token).await;
        false
    }
}
