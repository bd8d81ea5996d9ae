//! Error types for the compass pipeline

use thiserror::Error;

/// Errors surfaced by compass operations.
///
/// Every public operation reports failure through this type; nothing on the
/// library path panics on bad input or a misbehaving sensor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompassError {
    /// No heading hardware, or the platform cannot report one
    #[error("Compass not available on this device")]
    Unavailable,

    /// The user (or a policy) refused access to the heading source
    #[error("Location permission denied")]
    PermissionDenied,

    /// Permission has been requested but not answered yet; ask again later
    #[error("Permission not yet granted, retry once the user has answered")]
    PermissionPending,

    /// An option was out of range or not recognized
    #[error("{field}: {reason}")]
    InvalidOption { field: &'static str, reason: String },

    /// A one-shot reading did not arrive in time
    #[error("Timeout getting compass reading")]
    Timeout,

    /// Error reported by the platform sensor service
    #[error("Compass error: {0}")]
    NativeFault(String),
}

impl CompassError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        CompassError::InvalidOption {
            field,
            reason: reason.into(),
        }
    }

    /// True when the same call may succeed if repeated later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CompassError::PermissionPending)
    }

    /// The option name for validation failures.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            CompassError::InvalidOption { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CompassError {
    fn from(e: serde_json::Error) -> Self {
        CompassError::invalid("options", e.to_string())
    }
}
