//! Alternate descriptor sources.
//!
//! A source fetches a remote's descriptor from a fixed alternate URL. The
//! engine never fetches on its own initiative: sources are supplied by the
//! caller and only consulted after a descriptor-load failure.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use remote_guard_core::{RemoteDescriptor, RemoteError};

/// Fetches descriptors from alternate locations.
#[async_trait]
pub trait DescriptorSource: Send + Sync {
    /// Fetch the descriptor for `remote_id` from `url`.
    async fn fetch(&self, remote_id: &str, url: &str) -> Result<RemoteDescriptor, RemoteError>;

    /// Source name for logs.
    fn name(&self) -> &str {
        "descriptor-source"
    }
}

/// In-memory source serving pre-registered descriptor bodies by URL.
#[derive(Debug, Default)]
pub struct StaticSource {
    bodies: RwLock<HashMap<String, serde_json::Value>>,
}

impl StaticSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    pub fn insert(&self, url: impl Into<String>, body: serde_json::Value) {
        self.bodies.write().insert(url.into(), body);
    }

    /// Stop serving `url`.
    pub fn remove(&self, url: &str) {
        self.bodies.write().remove(url);
    }
}

#[async_trait]
impl DescriptorSource for StaticSource {
    async fn fetch(&self, remote_id: &str, url: &str) -> Result<RemoteDescriptor, RemoteError> {
        let body = self.bodies.read().get(url).cloned();
        match body {
            Some(body) => Ok(RemoteDescriptor {
                remote_id: remote_id.to_string(),
                source_url: url.to_string(),
                body,
            }),
            None => Err(RemoteError::Unreachable {
                remote_id: remote_id.to_string(),
                source_url: url.to_string(),
                reason: "no descriptor served".to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "static"
    }
}
