//! Error types for the portal engine
//!
//! Gateway failures pass through untouched (the gateway already classified
//! them); the remaining variants cover local conditions:
//! - Configuration loading and encoding
//! - Operations that need a loaded aggregate
//! - Activity ids the aggregate does not know

use portal_gateway::{ErrorKind, GatewayError};
use portal_model::ActivityId;
use std::path::PathBuf;

/// Main portal error type
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// Remote call failed
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Configuration value rejected
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error reading or writing a config file
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`crate::PortalConfig`]
    #[error("invalid config file: {0}")]
    TomlDecode(#[from] toml::de::Error),

    /// Config could not be encoded
    #[error("failed to encode config: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    /// Activity id not present in the loaded aggregate
    #[error("unknown activity: {0}")]
    UnknownActivity(ActivityId),

    /// Operation needs a loaded aggregate
    #[error("portal data has not been loaded")]
    NotLoaded,
}

impl PortalError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Underlying gateway error, if any
    #[inline]
    #[must_use]
    pub fn gateway_error(&self) -> Option<&GatewayError> {
        match self {
            Self::Gateway(err) => Some(err),
            _ => None,
        }
    }

    /// Gateway failure class, if any
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        self.gateway_error().map(|err| err.kind)
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.gateway_error().is_some_and(GatewayError::is_retryable)
    }
}
