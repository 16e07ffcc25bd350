//! Core types shared between the engine and the host runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::error::RemoteError;

/// The point in the remote-load sequence at which a failure occurred.
///
/// Stages are listed in load order. Anything the host reports that does not
/// map onto a known stage lands in [`LoadStage::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadStage {
    /// Before any network call is issued (e.g. blocked by policy)
    PreRequest,

    /// The remote's descriptor could not be fetched or parsed
    DescriptorLoad,

    /// Shared dependencies required by the remote could not be resolved
    DependencyResolution,

    /// The descriptor was obtained but the executable artifact failed
    ArtifactLoad,

    /// A stage name this engine does not recognise
    Unknown(String),
}

impl LoadStage {
    /// Canonical kebab-case name.
    pub fn as_str(&self) -> &str {
        match self {
            LoadStage::PreRequest => "pre-request",
            LoadStage::DescriptorLoad => "descriptor-load",
            LoadStage::DependencyResolution => "dependency-resolution",
            LoadStage::ArtifactLoad => "artifact-load",
            LoadStage::Unknown(name) => name,
        }
    }

    /// Whether the stage involves a network round trip that can count
    /// against a remote's health.
    pub fn is_network(&self) -> bool {
        !matches!(self, LoadStage::PreRequest)
    }
}

impl FromStr for LoadStage {
    type Err = Infallible;

    /// Accepts the kebab/snake names and the lifecycle hook names commonly
    /// used by module-federation style runtimes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stage = match s.trim() {
            "pre-request" | "pre_request" | "beforeRequest" => LoadStage::PreRequest,
            "descriptor-load" | "descriptor_load" | "manifest" | "afterResolve" => {
                LoadStage::DescriptorLoad
            }
            "dependency-resolution" | "dependency_resolution" | "beforeLoadShare"
            | "loadShare" => LoadStage::DependencyResolution,
            "artifact-load" | "artifact_load" | "onLoad" => LoadStage::ArtifactLoad,
            other => LoadStage::Unknown(other.to_string()),
        };
        Ok(stage)
    }
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStage::Unknown(name) => write!(f, "unknown({})", name),
            other => f.write_str(other.as_str()),
        }
    }
}

/// A request the host runtime is about to issue for a remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRequest {
    /// Stable identifier of the remote
    pub remote_id: String,

    /// Entry/descriptor URL, when the host has already resolved one
    #[serde(default)]
    pub entry: Option<String>,
}

impl RemoteRequest {
    /// Create a request with no resolved entry.
    pub fn new(remote_id: impl Into<String>) -> Self {
        Self {
            remote_id: remote_id.into(),
            entry: None,
        }
    }

    /// Set the entry URL.
    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = Some(entry.into());
        self
    }
}

/// A remote's machine-readable descriptor, as produced by an alternate source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDescriptor {
    /// Remote the descriptor belongs to
    pub remote_id: String,

    /// Where the descriptor was obtained
    pub source_url: String,

    /// Descriptor body, opaque to this engine
    #[serde(default)]
    pub body: serde_json::Value,
}

/// A failure reported by the host runtime.
#[derive(Debug, Clone)]
pub struct LoadFailure {
    /// Remote that failed
    pub remote_id: String,

    /// The failure, if the host supplied one
    pub error: Option<RemoteError>,

    /// Where in the load sequence it failed
    pub stage: LoadStage,

    /// The request being issued, for pre-request failures
    pub request: Option<RemoteRequest>,
}

impl LoadFailure {
    /// Create a failure for a remote at a stage.
    pub fn new(remote_id: impl Into<String>, stage: LoadStage) -> Self {
        Self {
            remote_id: remote_id.into(),
            error: None,
            stage,
            request: None,
        }
    }

    /// Attach the observed error.
    pub fn with_error(mut self, error: RemoteError) -> Self {
        self.error = Some(error);
        self
    }

    /// Attach the in-flight request.
    pub fn with_request(mut self, request: RemoteRequest) -> Self {
        self.request = Some(request);
        self
    }
}

/// Per-remote health bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteState {
    /// Stable key identifying the remote
    pub remote_id: String,

    /// Consecutive failures since the last success or reset
    pub failure_count: u32,

    /// Wall-clock time of the most recent failure
    pub last_failure_time: Option<DateTime<Utc>>,

    /// Whether requests to this remote are currently suppressed
    pub circuit_open: bool,
}

impl RemoteState {
    /// Fresh state: no failures, circuit closed.
    pub fn new(remote_id: impl Into<String>) -> Self {
        Self {
            remote_id: remote_id.into(),
            failure_count: 0,
            last_failure_time: None,
            circuit_open: false,
        }
    }

    /// Observable breaker state.
    pub fn circuit(&self) -> CircuitState {
        if self.circuit_open {
            CircuitState::Open
        } else {
            CircuitState::Closed
        }
    }
}

/// Observable state of a remote's circuit.
///
/// There is deliberately no half-open state: an open circuit is closed by a
/// timed reset, after which the next request is fully trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation
    Closed,

    /// Requests are rejected without contacting the network
    Open,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
        }
    }
}
