//! # remote-guard-runtime
//!
//! Failure interception for remotely loaded artifacts.
//!
//! A host runtime loads independently deployed remotes over the network and
//! calls into this crate whenever a load fails. The engine makes sure no such
//! failure becomes fatal for the application:
//!
//! - [`RemoteStateRegistry`] tracks consecutive failures per remote
//! - [`CircuitBreaker`] stops contacting a remote once it keeps failing, and
//!   closes again after a timed reset
//! - [`RetryExecutor`] wraps a caller-supplied fetch with bounded retry,
//!   per-attempt timeout and linear backoff
//! - [`FallbackArtifactCache`] hands out one stable placeholder per remote
//!   and failure signature
//! - [`LifecycleDispatcher`] routes each failure by load stage and always
//!   answers with a usable [`Recovery`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use remote_guard_core::{LoadFailure, LoadStage, RemoteError, ResilienceConfig};
//! use remote_guard_runtime::{LifecycleDispatcher, Recovery};
//!
//! let dispatcher = LifecycleDispatcher::new(ResilienceConfig::default());
//!
//! let failure = LoadFailure::new("checkout", LoadStage::ArtifactLoad)
//!     .with_error(RemoteError::load("chunk failed"));
//!
//! if let Recovery::Factory(factory) = dispatcher.on_failure(failure).await {
//!     let placeholder = factory.invoke();
//!     render(placeholder);
//! }
//! ```

pub mod cache;
pub mod dispatcher;
pub mod hooks;
pub mod resilience;
pub mod sources;

pub use cache::FallbackArtifactCache;
pub use dispatcher::{LifecycleDispatcher, LifecycleDispatcherBuilder};
pub use hooks::{HostInit, LoadHooks, RequestGate};
pub use resilience::{
    ArtifactFactory, CircuitBreaker, FallbackStrategy, HealthRecorder, LinearBackoff,
    LinearBuilder, Recovery, RemoteStateRegistry, RetryExecutor,
};
pub use sources::{DescriptorSource, StaticSource};
