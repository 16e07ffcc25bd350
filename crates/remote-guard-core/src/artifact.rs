//! Substitute artifacts returned in place of a failed remote.

use serde::{Deserialize, Serialize};

use crate::error::{failure_signature, RemoteError};

/// The value handed back to the host instead of the real remote artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackArtifact {
    /// Generic placeholder describing the remote as unavailable
    Unavailable {
        /// Remote that could not be loaded
        remote_id: String,

        /// Failure detail shown alongside the placeholder
        detail: String,
    },

    /// Caller-supplied substitute for a specific remote
    Custom {
        /// Remote the override was registered for
        remote_id: String,

        /// Opaque payload from configuration
        payload: serde_json::Value,
    },
}

impl FallbackArtifact {
    /// Build the generic "unavailable" placeholder for a failure.
    pub fn unavailable(remote_id: impl Into<String>, error: Option<&RemoteError>) -> Self {
        let detail = match error {
            Some(e) => e.to_string(),
            None => "remote could not be loaded".to_string(),
        };
        Self::Unavailable {
            remote_id: remote_id.into(),
            detail,
        }
    }

    /// Wrap a caller-supplied payload.
    pub fn custom(remote_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::Custom {
            remote_id: remote_id.into(),
            payload,
        }
    }

    /// Remote this artifact stands in for.
    pub fn remote_id(&self) -> &str {
        match self {
            Self::Unavailable { remote_id, .. } | Self::Custom { remote_id, .. } => remote_id,
        }
    }

    /// Whether this is a caller-supplied override.
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom { .. })
    }
}

/// Cache key for a fallback: `"{remote_id}:{signature}"`.
pub fn cache_key(remote_id: &str, error: Option<&RemoteError>) -> String {
    format!("{}:{}", remote_id, failure_signature(error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key("shop", None), "shop:default");
        assert_eq!(
            cache_key("shop", Some(&RemoteError::load("404"))),
            "shop:404"
        );
    }

    #[test]
    fn test_unavailable_carries_detail() {
        let artifact = FallbackArtifact::unavailable("shop", Some(&RemoteError::load("404")));
        assert_eq!(
            artifact,
            FallbackArtifact::Unavailable {
                remote_id: "shop".to_string(),
                detail: "404".to_string(),
            }
        );
        assert!(!artifact.is_custom());
    }

    #[test]
    fn test_serialized_shape() {
        let artifact = FallbackArtifact::custom("nav", serde_json::json!({"title": "Offline"}));
        let value = serde_json::to_value(&artifact).unwrap();
        assert_eq!(value["kind"], "custom");
        assert_eq!(value["remote_id"], "nav");
        assert_eq!(value["payload"]["title"], "Offline");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_cache_key_is_id_then_message(id in "[a-z][a-z0-9-]{0,12}", message in ".{1,40}") {
                let key = cache_key(&id, Some(&RemoteError::load(message.clone())));
                prop_assert_eq!(key, format!("{}:{}", id, message));
            }

            #[test]
            fn prop_unavailable_detail_carries_error(message in "[ -~]{1,40}") {
                let artifact = FallbackArtifact::unavailable("r", Some(&RemoteError::load(message.clone())));
                let detail = match artifact {
                    FallbackArtifact::Unavailable { detail, .. } => detail,
                    FallbackArtifact::Custom { .. } => unreachable!(),
                };
                prop_assert_eq!(detail, message);
            }
        }
    }
}
