//! Circuit breaker gating access to failing remotes.
//!
//! When a remote fails repeatedly its circuit opens and subsequent loads go
//! straight to a fallback artifact without touching the network. Two states
//! only: an open circuit is closed by a blind timed reset, not by a half-open
//! probe.

use std::sync::Arc;

use remote_guard_core::{CircuitState, RemoteError, ResilienceConfig};

use super::registry::RemoteStateRegistry;

/// Per-remote circuit breaker over a shared [`RemoteStateRegistry`].
///
/// Each remote has its own circuit to allow independent recovery.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    registry: Arc<RemoteStateRegistry>,
    enabled: bool,
}

impl CircuitBreaker {
    /// Create a breaker over a registry.
    pub fn new(registry: Arc<RemoteStateRegistry>, config: &ResilienceConfig) -> Self {
        Self {
            registry,
            enabled: config.enable_circuit_breaker,
        }
    }

    /// Check if the circuit is open for a remote.
    ///
    /// Returns true if the load should skip the network and use a fallback.
    pub fn is_open(&self, remote_id: &str) -> bool {
        self.enabled && self.registry.is_open(remote_id)
    }

    /// Reject the call with [`RemoteError::CircuitOpen`] if the circuit is open.
    pub fn check(&self, remote_id: &str) -> Result<(), RemoteError> {
        if self.is_open(remote_id) {
            Err(RemoteError::CircuitOpen {
                remote_id: remote_id.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Get current state of a circuit.
    pub fn state(&self, remote_id: &str) -> CircuitState {
        if self.is_open(remote_id) {
            CircuitState::Open
        } else {
            CircuitState::Closed
        }
    }

    /// Record a successful load.
    pub fn record_success(&self, remote_id: &str) {
        self.registry.record_success(remote_id);
    }

    /// Record a failed load. Returns whether the circuit is now open.
    pub fn record_failure(&self, remote_id: &str) -> bool {
        self.registry.record_failure(remote_id).circuit_open
    }

    /// The registry backing this breaker.
    pub fn registry(&self) -> &Arc<RemoteStateRegistry> {
        &self.registry
    }
}
