//! Failure taxonomy for remote loading.

use std::time::Duration;
use thiserror::Error;

/// Sentinel signature used when a failure carries no error value.
pub const DEFAULT_SIGNATURE: &str = "default";

/// Errors observed while loading a remote.
///
/// None of these ever reach the consuming application. They are logged and
/// folded into the detail text of the fallback artifact that replaces the
/// remote.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// A load failure reported by the host runtime. Displays as the raw
    /// message so it can serve as the failure signature.
    #[error("{0}")]
    Load(String),

    #[error("operation timed out after {}", humantime::format_duration(*.0))]
    Timeout(Duration),

    #[error("circuit open for remote '{remote_id}'")]
    CircuitOpen { remote_id: String },

    #[error("alternate source {source_url} for remote '{remote_id}' failed: {reason}")]
    Unreachable {
        remote_id: String,
        source_url: String,
        reason: String,
    },
}

impl RemoteError {
    /// Create a load failure from any message.
    pub fn load(message: impl Into<String>) -> Self {
        Self::Load(message.into())
    }

    /// Whether this is the breaker's own rejection rather than a real failure.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// Whether the failure was a timed-out attempt.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Signature of an optional failure: its message, or [`DEFAULT_SIGNATURE`].
pub fn failure_signature(error: Option<&RemoteError>) -> String {
    error
        .map(|e| e.to_string())
        .unwrap_or_else(|| DEFAULT_SIGNATURE.to_string())
}
