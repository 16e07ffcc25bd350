//! Hook surface exposed to the host runtime.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use remote_guard_core::{LoadFailure, RemoteError, RemoteRequest};

use crate::resilience::Recovery;

/// What the host tells the engine when it starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostInit {
    /// Name of the host application, for logs
    #[serde(default)]
    pub host: Option<String>,

    /// Remotes the host is configured to load
    #[serde(default)]
    pub remotes: Vec<String>,
}

impl HostInit {
    /// Create an init message listing the host's remotes.
    pub fn new<I, S>(remotes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            host: None,
            remotes: remotes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Decision of the pre-request filter.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestGate {
    /// Issue the (possibly redirected) request
    Proceed(RemoteRequest),

    /// The breaker rejected the request. The host reports `reason` back
    /// through [`LoadHooks::on_load_error`] and receives a fallback.
    Rejected {
        request: RemoteRequest,
        reason: RemoteError,
    },
}

impl RequestGate {
    /// Whether the request may go out.
    pub fn is_proceed(&self) -> bool {
        matches!(self, RequestGate::Proceed(_))
    }

    /// The request, whichever way the gate decided.
    pub fn request(&self) -> &RemoteRequest {
        match self {
            RequestGate::Proceed(request) | RequestGate::Rejected { request, .. } => request,
        }
    }
}

/// Hooks a host runtime calls while loading remotes.
///
/// # Contract
/// - No hook may fail: every call yields a usable value
/// - `on_load_error` never returns "nothing"; the host treats an empty
///   answer as "propagate the original fatal error"
/// - Hooks for different remotes are independent and may run concurrently
#[async_trait]
pub trait LoadHooks: Send + Sync {
    /// Name of this hook set, for host diagnostics.
    fn name(&self) -> &str;

    /// Called once when the host starts, with the remotes it knows about.
    fn init(&self, init: &HostInit);

    /// Pre-request filter.
    async fn before_request(&self, request: RemoteRequest) -> RequestGate;

    /// A remote loaded successfully.
    async fn on_load_success(&self, remote_id: &str);

    /// A remote failed at some stage of its load.
    async fn on_load_error(&self, failure: LoadFailure) -> Recovery;
}
