//! Resilience patterns for remote loading.
//!
//! This module provides:
//! - Per-remote health registry with timed circuit reset
//! - Circuit breaker to stop hammering failing remotes
//! - Retry with timeout and linear backoff
//! - Fallback strategies and recovery values

mod circuit_breaker;
mod fallback;
mod registry;
mod retry;

pub use circuit_breaker::CircuitBreaker;
pub use fallback::{ArtifactFactory, FallbackStrategy, Recovery};
pub use registry::{HealthRecorder, RemoteStateRegistry};
pub use retry::{LinearBackoff, LinearBuilder, RetryExecutor};
