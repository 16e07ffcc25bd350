//! # remote-guard-core
//!
//! Data model, failure taxonomy and configuration for the remote-guard
//! resilience engine.
//!
//! A host runtime loads independently deployed remotes in stages
//! (pre-request, descriptor, shared dependencies, artifact). This crate
//! describes those stages, the per-remote health state, the substitute
//! artifacts that replace a failed remote, and the options that tune the
//! engine. It is synchronous and performs no I/O beyond reading config files;
//! the async engine lives in `remote-guard-runtime`.
//!
//! ## Example
//!
//! ```rust
//! use remote_guard_core::{cache_key, LoadStage, RemoteError, ResilienceConfig};
//!
//! let config = ResilienceConfig::from_yaml("circuitBreakerThreshold: 5").unwrap();
//! assert_eq!(config.circuit_breaker_threshold, 5);
//!
//! let stage: LoadStage = "artifact-load".parse().unwrap();
//! assert_eq!(stage, LoadStage::ArtifactLoad);
//!
//! assert_eq!(cache_key("shop", Some(&RemoteError::load("404"))), "shop:404");
//! ```

pub mod artifact;
pub mod config;
pub mod error;
pub mod types;

pub use artifact::{cache_key, FallbackArtifact};
pub use config::{ConfigError, ResilienceConfig};
pub use error::{failure_signature, RemoteError, DEFAULT_SIGNATURE};
pub use types::{
    CircuitState, LoadFailure, LoadStage, RemoteDescriptor, RemoteRequest, RemoteState,
};
