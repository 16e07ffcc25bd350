//! Fallback strategies and the values handed back to the host runtime.

use std::fmt;
use std::sync::Arc;

use remote_guard_core::{FallbackArtifact, LoadStage, RemoteDescriptor, RemoteRequest};

/// How a failure is recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackStrategy {
    /// Hand the request back so the host can retry or redirect it
    PassThrough,

    /// Fetch a fixed alternate descriptor with retry, then placeholder
    AlternateSource,

    /// Substitute the cached placeholder artifact
    Placeholder,

    /// Substitute a factory yielding the placeholder on instantiation
    Factory,
}

impl FallbackStrategy {
    /// Pick the strategy for a failure.
    ///
    /// An open circuit skips every attempt to reach the network, but the
    /// returned value keeps the shape the host expects for the stage.
    pub fn for_stage(stage: &LoadStage, circuit_open: bool, has_alternate: bool) -> Self {
        match stage {
            LoadStage::ArtifactLoad => FallbackStrategy::Factory,
            _ if circuit_open => FallbackStrategy::Placeholder,
            LoadStage::PreRequest => FallbackStrategy::PassThrough,
            LoadStage::DescriptorLoad if has_alternate => FallbackStrategy::AlternateSource,
            LoadStage::DescriptorLoad
            | LoadStage::DependencyResolution
            | LoadStage::Unknown(_) => FallbackStrategy::Placeholder,
        }
    }
}

/// Zero-argument factory yielding a fallback artifact.
///
/// Returned for artifact-load failures, where the host expects a module
/// loader rather than the module itself.
#[derive(Clone)]
pub struct ArtifactFactory {
    make: Arc<dyn Fn() -> Arc<FallbackArtifact> + Send + Sync>,
}

impl ArtifactFactory {
    /// Factory always yielding `artifact`.
    pub fn for_artifact(artifact: Arc<FallbackArtifact>) -> Self {
        Self {
            make: Arc::new(move || Arc::clone(&artifact)),
        }
    }

    /// Produce the artifact.
    pub fn invoke(&self) -> Arc<FallbackArtifact> {
        (self.make)()
    }
}

impl fmt::Debug for ArtifactFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactFactory").finish_non_exhaustive()
    }
}

/// The value the dispatcher hands back to the host. Never empty.
#[derive(Debug, Clone)]
pub enum Recovery {
    /// Retry the (possibly redirected) request
    Request(RemoteRequest),

    /// Substitute descriptor from an alternate source
    Descriptor(RemoteDescriptor),

    /// Substitute artifact
    Artifact(Arc<FallbackArtifact>),

    /// Loader yielding the substitute artifact
    Factory(ArtifactFactory),
}

impl Recovery {
    /// Short name of the recovery kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Recovery::Request(_) => "request",
            Recovery::Descriptor(_) => "descriptor",
            Recovery::Artifact(_) => "artifact",
            Recovery::Factory(_) => "factory",
        }
    }

    /// The substitute artifact, invoking the factory if needed.
    pub fn artifact(&self) -> Option<Arc<FallbackArtifact>> {
        match self {
            Recovery::Artifact(artifact) => Some(Arc::clone(artifact)),
            Recovery::Factory(factory) => Some(factory.invoke()),
            _ => None,
        }
    }

    /// JSON summary for logs and tooling.
    pub fn describe(&self) -> serde_json::Value {
        match self {
            Recovery::Request(request) => serde_json::json!({
                "kind": self.kind(),
                "request": request,
            }),
            Recovery::Descriptor(descriptor) => serde_json::json!({
                "kind": self.kind(),
                "descriptor": descriptor,
            }),
            Recovery::Artifact(artifact) => serde_json::json!({
                "kind": self.kind(),
                "artifact": artifact.as_ref(),
            }),
            Recovery::Factory(factory) => serde_json::json!({
                "kind": self.kind(),
                "yields": factory.invoke().as_ref(),
            }),
        }
    }
}
