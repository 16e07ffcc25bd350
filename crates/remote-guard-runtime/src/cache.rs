//! Fallback artifact cache.
//!
//! Memoizes substitute artifacts per remote and failure signature so a remote
//! that keeps failing the same way is always replaced by the same `Arc`
//! instance. The cache is unbounded and has no TTL: its key space is the
//! configured remotes times the distinct errors actually observed.

use moka::future::Cache;
use std::collections::HashMap;
use std::sync::Arc;

use remote_guard_core::{cache_key, FallbackArtifact, RemoteError, ResilienceConfig};

/// Get-or-create cache of fallback artifacts using moka.
pub struct FallbackArtifactCache {
    cache: Cache<String, Arc<FallbackArtifact>>,
    overrides: HashMap<String, serde_json::Value>,
    logging: bool,
}

impl FallbackArtifactCache {
    /// Create a cache using the configured per-remote overrides.
    pub fn new(config: &ResilienceConfig) -> Self {
        Self {
            cache: Cache::builder().build(),
            overrides: config.fallback_artifacts.clone(),
            logging: config.enable_logging,
        }
    }

    /// Get the cached fallback for a failure, building it on first use.
    ///
    /// Concurrent misses for the same key construct the artifact once.
    pub async fn get_or_create(
        &self,
        remote_id: &str,
        error: Option<&RemoteError>,
    ) -> Arc<FallbackArtifact> {
        let key = cache_key(remote_id, error);
        if let Some(artifact) = self.cache.get(&key).await {
            if self.logging {
                tracing::debug!(remote_id = %remote_id, key = %key, "Fallback cache hit");
            }
            return artifact;
        }

        let init = async {
            let artifact = self.build(remote_id, error);
            if self.logging {
                tracing::debug!(
                    remote_id = %remote_id,
                    key = %key,
                    custom = artifact.is_custom(),
                    "Fallback artifact created"
                );
            }
            Arc::new(artifact)
        };

        self.cache.get_with(key.clone(), init).await
    }

    /// Look up a fallback without creating one.
    pub async fn get(&self, remote_id: &str, error: Option<&RemoteError>) -> Option<Arc<FallbackArtifact>> {
        self.cache.get(&cache_key(remote_id, error)).await
    }

    /// Number of cached artifacts.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    fn build(&self, remote_id: &str, error: Option<&RemoteError>) -> FallbackArtifact {
        match self.overrides.get(remote_id) {
            Some(payload) => FallbackArtifact::custom(remote_id, payload.clone()),
            None => FallbackArtifact::unavailable(remote_id, error),
        }
    }
}

impl Default for FallbackArtifactCache {
    fn default() -> Self {
        Self::new(&ResilienceConfig::default())
    }
}

impl std::fmt::Debug for FallbackArtifactCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackArtifactCache")
            .field("entries", &self.cache.entry_count())
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}
