//! Portal configuration
//!
//! Loaded from TOML, then overridden from the environment. The bearer
//! credential is accepted from the environment only and never written back.

use crate::error::PortalError;
use portal_gateway::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Overrides the gateway origin
pub const ENV_BASE_URL: &str = "GUEST_PORTAL_BASE_URL";
/// Supplies the bearer credential
pub const ENV_CREDENTIAL: &str = "GUEST_PORTAL_CREDENTIAL";
/// Overrides the request timeout in seconds
pub const ENV_TIMEOUT_SECS: &str = "GUEST_PORTAL_TIMEOUT_SECS";

/// Default idle lifetime of a guest session
pub const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;
/// Default number of concurrently cached sessions
pub const DEFAULT_MAX_SESSIONS: u64 = 1_000;

/// Top-level portal configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Remote gateway settings
    pub gateway: GatewayConfig,
    /// Idle seconds before a session is evicted
    pub session_ttl_secs: u64,
    /// Session cache capacity
    pub max_sessions: u64,
}

impl PortalConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With gateway settings
    #[inline]
    #[must_use]
    pub fn with_gateway(mut self, gateway: GatewayConfig) -> Self {
        self.gateway = gateway;
        self
    }

    /// With session idle lifetime
    #[inline]
    #[must_use]
    pub fn with_session_ttl_secs(mut self, secs: u64) -> Self {
        self.session_ttl_secs = secs;
        self
    }

    /// With session cache capacity
    #[inline]
    #[must_use]
    pub fn with_max_sessions(mut self, max: u64) -> Self {
        self.max_sessions = max;
        self
    }

    /// Session idle lifetime
    #[inline]
    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs.max(1))
    }

    /// Parse configuration from a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self, PortalError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Encode configuration as TOML
    pub fn to_toml_string(&self) -> Result<String, PortalError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load configuration from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PortalError> {
        let path = path.as_ref();
        let raw =
            std::fs::read_to_string(path).map_err(|err| PortalError::io_error(path, err))?;
        let config = Self::from_toml_str(&raw)?;
        debug!(path = %path.display(), "loaded portal config");
        Ok(config)
    }

    /// Load configuration from a file if it exists, defaults otherwise
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, PortalError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write configuration to a file, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PortalError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| PortalError::io_error(parent, err))?;
        }
        let encoded = self.to_toml_string()?;
        std::fs::write(path, encoded).map_err(|err| PortalError::io_error(path, err))?;
        debug!(path = %path.display(), "saved portal config");
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env(self) -> Result<Self, PortalError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self, PortalError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.gateway.base_url = base_url.trim().to_string();
        }
        if let Some(credential) = lookup(ENV_CREDENTIAL).filter(|v| !v.trim().is_empty()) {
            self.gateway.credential = Some(credential.trim().to_string());
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.gateway.timeout_secs = raw.trim().parse().map_err(|_| {
                PortalError::Config(format!("{ENV_TIMEOUT_SECS} must be whole seconds, got {raw:?}"))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject values no session could run with
    pub fn validate(&self) -> Result<(), PortalError> {
        if self.gateway.base_url.trim().is_empty() {
            return Err(PortalError::Config("gateway.base_url is empty".to_string()));
        }
        if self.max_sessions == 0 {
            return Err(PortalError::Config("max_sessions must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}
