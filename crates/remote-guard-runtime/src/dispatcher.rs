//! Lifecycle dispatcher: the entry point the host runtime calls on failure.
//!
//! The dispatcher routes each failure by load stage:
//! - pre-request: hand the request back (optionally redirected)
//! - descriptor-load: try the alternate source with retry, then placeholder
//! - dependency-resolution and unknown stages: cached placeholder
//! - artifact-load: factory yielding the cached placeholder
//!
//! An open circuit skips every network attempt. Whatever happens, a usable
//! [`Recovery`] comes back; the host treats an empty answer as "propagate
//! the original fatal error".

use async_trait::async_trait;
use std::sync::Arc;

use remote_guard_core::{
    ConfigError, LoadFailure, LoadStage, RemoteError, RemoteRequest, RemoteState,
    ResilienceConfig,
};

use crate::cache::FallbackArtifactCache;
use crate::hooks::{HostInit, LoadHooks, RequestGate};
use crate::resilience::{
    ArtifactFactory, CircuitBreaker, FallbackStrategy, Recovery, RemoteStateRegistry,
    RetryExecutor,
};
use crate::sources::DescriptorSource;

/// Routes load failures to the right fallback.
///
/// Each dispatcher owns its registry; two dispatchers never share remote
/// health.
pub struct LifecycleDispatcher {
    config: ResilienceConfig,
    registry: Arc<RemoteStateRegistry>,
    breaker: CircuitBreaker,
    retry: RetryExecutor,
    cache: FallbackArtifactCache,
    source: Option<Arc<dyn DescriptorSource>>,
}

impl LifecycleDispatcher {
    /// Create a dispatcher with no alternate descriptor source.
    pub fn new(config: ResilienceConfig) -> Self {
        let registry = Arc::new(RemoteStateRegistry::new(&config));
        let breaker = CircuitBreaker::new(Arc::clone(&registry), &config);
        let retry = RetryExecutor::new(registry.clone(), &config);
        let cache = FallbackArtifactCache::new(&config);

        Self {
            config,
            registry,
            breaker,
            retry,
            cache,
            source: None,
        }
    }

    /// Start building a dispatcher.
    pub fn builder() -> LifecycleDispatcherBuilder {
        LifecycleDispatcherBuilder::new()
    }

    /// Handle a failure reported by the host. Never fails.
    pub async fn on_failure(&self, failure: LoadFailure) -> Recovery {
        let LoadFailure {
            remote_id,
            error,
            stage,
            request,
        } = failure;

        let was_open = self.breaker.is_open(&remote_id);
        self.log_failure(&remote_id, &stage, error.as_ref(), was_open);

        let alternate = match &self.source {
            Some(source) => self
                .config
                .alternate_sources
                .get(&remote_id)
                .map(|url| (Arc::clone(source), url.clone())),
            None => None,
        };

        // Only real network failures count against the remote. When the
        // alternate fetch runs, its retry outcome is the one recorded.
        let fetches_alternate =
            !was_open && alternate.is_some() && stage == LoadStage::DescriptorLoad;
        let counts = stage.is_network()
            && !fetches_alternate
            && !error.as_ref().is_some_and(RemoteError::is_circuit_open);
        let now_open = !was_open && counts && self.breaker.record_failure(&remote_id);
        let circuit_open = was_open || now_open;

        match FallbackStrategy::for_stage(&stage, circuit_open, alternate.is_some()) {
            FallbackStrategy::PassThrough => {
                let request = request.unwrap_or_else(|| RemoteRequest::new(&remote_id));
                Recovery::Request(self.redirect(request))
            }
            FallbackStrategy::AlternateSource => match alternate {
                Some((source, url)) => {
                    self.recover_descriptor(&remote_id, error.as_ref(), source, url)
                        .await
                }
                None => self.placeholder(&remote_id, error.as_ref()).await,
            },
            FallbackStrategy::Placeholder => self.placeholder(&remote_id, error.as_ref()).await,
            FallbackStrategy::Factory => {
                let artifact = self.cache.get_or_create(&remote_id, error.as_ref()).await;
                Recovery::Factory(ArtifactFactory::for_artifact(artifact))
            }
        }
    }

    /// Handle a successful load: resets the remote's health.
    pub fn on_success(&self, remote_id: &str) {
        self.registry.record_success(remote_id);
        if self.config.enable_logging {
            tracing::debug!(remote_id = %remote_id, "Remote loaded");
        }
    }

    /// Pre-request filter: rejects requests to remotes with an open circuit.
    pub fn gate(&self, request: RemoteRequest) -> RequestGate {
        match self.breaker.check(&request.remote_id) {
            Ok(()) => {
                if self.config.enable_logging {
                    tracing::debug!(remote_id = %request.remote_id, "Request passed breaker");
                }
                RequestGate::Proceed(request)
            }
            Err(reason) => {
                if self.config.enable_logging {
                    tracing::warn!(
                        remote_id = %request.remote_id,
                        "Circuit open, rejecting request without contacting the network"
                    );
                }
                RequestGate::Rejected { request, reason }
            }
        }
    }

    /// Log the resolved configuration and check it against the host's remotes.
    pub fn initialize(&self, init: &HostInit) {
        if !self.config.enable_logging {
            return;
        }

        tracing::info!(
            host = init.host.as_deref().unwrap_or("unknown"),
            remotes = init.remotes.len(),
            retry_attempts = self.config.retry_attempts,
            retry_delay = %humantime::format_duration(self.config.retry_delay),
            fallback_timeout = %humantime::format_duration(self.config.fallback_timeout),
            circuit_breaker = self.config.enable_circuit_breaker,
            threshold = self.config.circuit_breaker_threshold,
            reset_timeout = %humantime::format_duration(self.config.circuit_breaker_reset_timeout),
            "Remote resilience initialized"
        );

        if init.remotes.is_empty() {
            return;
        }

        let configured = self
            .config
            .fallback_artifacts
            .keys()
            .chain(self.config.alternate_sources.keys());
        for remote_id in configured {
            if !init.remotes.iter().any(|r| r == remote_id) {
                tracing::warn!(
                    remote_id = %remote_id,
                    "Override configured for a remote the host does not load"
                );
            }
        }
    }

    /// Current health of one remote.
    pub fn remote_state(&self, remote_id: &str) -> RemoteState {
        self.registry.get(remote_id)
    }

    /// Health of every remote seen so far, sorted by id.
    pub fn snapshot(&self) -> Vec<RemoteState> {
        self.registry.snapshot()
    }

    /// The circuit breaker.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// The retry executor, for callers wrapping their own fetches.
    pub fn retry(&self) -> &RetryExecutor {
        &self.retry
    }

    /// The fallback cache.
    pub fn cache(&self) -> &FallbackArtifactCache {
        &self.cache
    }

    /// Resolved configuration.
    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    async fn placeholder(&self, remote_id: &str, error: Option<&RemoteError>) -> Recovery {
        Recovery::Artifact(self.cache.get_or_create(remote_id, error).await)
    }

    async fn recover_descriptor(
        &self,
        remote_id: &str,
        error: Option<&RemoteError>,
        source: Arc<dyn DescriptorSource>,
        url: String,
    ) -> Recovery {
        let fetched = self
            .retry
            .with_retry(remote_id, || {
                let source = Arc::clone(&source);
                let remote_id = remote_id.to_string();
                let url = url.clone();
                async move { source.fetch(&remote_id, &url).await }
            })
            .await;

        match fetched {
            Ok(descriptor) => {
                if self.config.enable_logging {
                    tracing::info!(
                        remote_id = %remote_id,
                        source = source.name(),
                        url = %url,
                        "Recovered descriptor from alternate source"
                    );
                }
                Recovery::Descriptor(descriptor)
            }
            Err(alternate_error) => {
                if self.config.enable_logging {
                    tracing::warn!(
                        remote_id = %remote_id,
                        url = %url,
                        error = %alternate_error,
                        "Alternate source failed, using fallback artifact"
                    );
                }
                // Keyed by the original failure so the placeholder stays stable
                self.placeholder(remote_id, error).await
            }
        }
    }

    fn redirect(&self, request: RemoteRequest) -> RemoteRequest {
        match self.config.alternate_sources.get(&request.remote_id) {
            Some(url) => {
                if self.config.enable_logging {
                    tracing::info!(
                        remote_id = %request.remote_id,
                        url = %url,
                        "Redirecting request to alternate source"
                    );
                }
                request.with_entry(url.clone())
            }
            None => request,
        }
    }

    fn log_failure(
        &self,
        remote_id: &str,
        stage: &LoadStage,
        error: Option<&RemoteError>,
        circuit_open: bool,
    ) {
        if !self.config.enable_logging {
            return;
        }

        let error = error.map(|e| e.to_string()).unwrap_or_default();
        if circuit_open {
            tracing::warn!(
                remote_id = %remote_id,
                stage = %stage,
                error = %error,
                "Circuit open, falling back without contacting the network"
            );
        } else if let LoadStage::Unknown(name) = stage {
            tracing::warn!(
                remote_id = %remote_id,
                stage = %name,
                error = %error,
                "Unrecognized load stage, using generic fallback"
            );
        } else {
            tracing::warn!(
                remote_id = %remote_id,
                stage = %stage,
                error = %error,
                "Remote failed to load"
            );
        }
    }
}

#[async_trait]
impl LoadHooks for LifecycleDispatcher {
    fn name(&self) -> &str {
        "remote-guard"
    }

    fn init(&self, init: &HostInit) {
        self.initialize(init);
    }

    async fn before_request(&self, request: RemoteRequest) -> RequestGate {
        self.gate(request)
    }

    async fn on_load_success(&self, remote_id: &str) {
        self.on_success(remote_id);
    }

    async fn on_load_error(&self, failure: LoadFailure) -> Recovery {
        self.on_failure(failure).await
    }
}

impl std::fmt::Debug for LifecycleDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleDispatcher")
            .field("registry", &self.registry)
            .field("retry", &self.retry)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

/// Builder for [`LifecycleDispatcher`].
pub struct LifecycleDispatcherBuilder {
    config: ResilienceConfig,
    source: Option<Arc<dyn DescriptorSource>>,
}

impl LifecycleDispatcherBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: ResilienceConfig::default(),
            source: None,
        }
    }

    /// Set the configuration.
    pub fn config(mut self, config: ResilienceConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach an alternate descriptor source.
    pub fn source(mut self, source: Arc<dyn DescriptorSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Validate the configuration and build the dispatcher.
    pub fn build(self) -> Result<LifecycleDispatcher, ConfigError> {
        self.config.validate()?;

        let mut dispatcher = LifecycleDispatcher::new(self.config);
        dispatcher.source = self.source;
        Ok(dispatcher)
    }
}

impl Default for LifecycleDispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_guard_core::{FallbackArtifact, RemoteDescriptor};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    const BACKUP_URL: &str = "https://backup.example.com/foo.json";

    // Counts fetches; fails unless a body is set
    struct CountingSource {
        calls: AtomicU32,
        body: Option<serde_json::Value>,
    }

    impl CountingSource {
        fn new(body: Option<serde_json::Value>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                body,
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DescriptorSource for CountingSource {
        async fn fetch(&self, remote_id: &str, url: &str) -> Result<RemoteDescriptor, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.body {
                Some(body) => Ok(RemoteDescriptor {
                    remote_id: remote_id.to_string(),
                    source_url: url.to_string(),
                    body: body.clone(),
                }),
                None => Err(RemoteError::Unreachable {
                    remote_id: remote_id.to_string(),
                    source_url: url.to_string(),
                    reason: "connection refused".to_string(),
                }),
            }
        }
    }

    // Records the target of every engine event
    struct CaptureTargets(Arc<parking_lot::Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> Layer<S> for CaptureTargets {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let target = event.metadata().target();
            if target.starts_with("remote_guard") {
                self.0.lock().push(target.to_string());
            }
        }
    }

    fn config() -> ResilienceConfig {
        ResilienceConfig::default()
            .with_threshold(3)
            .with_retry(2, Duration::from_millis(100), Duration::from_millis(500))
            .with_alternate_source("foo", BACKUP_URL)
    }

    fn dispatcher_with(source: Arc<CountingSource>) -> LifecycleDispatcher {
        LifecycleDispatcher::builder()
            .config(config())
            .source(source)
            .build()
            .unwrap()
    }

    fn failure(remote_id: &str, stage: LoadStage, message: &str) -> LoadFailure {
        LoadFailure::new(remote_id, stage).with_error(RemoteError::load(message))
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_skips_alternate_source() {
        let source = CountingSource::new(Some(serde_json::json!({"ok": true})));
        let dispatcher = dispatcher_with(source.clone());

        for _ in 0..3 {
            dispatcher.breaker().record_failure("foo");
        }
        assert!(dispatcher.breaker().is_open("foo"));

        let error = RemoteError::load("manifest 503");
        let recovery = dispatcher
            .on_failure(LoadFailure::new("foo", LoadStage::DescriptorLoad).with_error(error.clone()))
            .await;

        let artifact = match recovery {
            Recovery::Artifact(artifact) => artifact,
            other => panic!("Expected artifact, got {:?}", other),
        };
        assert_eq!(source.calls(), 0);

        let cached = dispatcher.cache().get_or_create("foo", Some(&error)).await;
        assert!(Arc::ptr_eq(&artifact, &cached));
    }

    #[tokio::test]
    async fn test_artifact_load_returns_factory() {
        let dispatcher = LifecycleDispatcher::new(ResilienceConfig::default());

        let recovery = dispatcher
            .on_failure(failure("bar", LoadStage::ArtifactLoad, "404"))
            .await;

        let factory = match recovery {
            Recovery::Factory(factory) => factory,
            other => panic!("Expected factory, got {:?}", other),
        };

        let produced = factory.invoke();
        let direct = dispatcher
            .cache()
            .get_or_create("bar", Some(&RemoteError::load("404")))
            .await;

        assert_eq!(*produced, *direct);
        assert!(Arc::ptr_eq(&produced, &direct));
        assert_eq!(
            *produced,
            FallbackArtifact::Unavailable {
                remote_id: "bar".to_string(),
                detail: "404".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_pre_request_returns_request() {
        let dispatcher = LifecycleDispatcher::new(ResilienceConfig::default());
        let request = RemoteRequest::new("cart").with_entry("https://cdn.example.com/cart.json");

        let recovery = dispatcher
            .on_failure(
                failure("cart", LoadStage::PreRequest, "blocked").with_request(request.clone()),
            )
            .await;

        match recovery {
            Recovery::Request(returned) => assert_eq!(returned, request),
            other => panic!("Expected request, got {:?}", other),
        }

        // Policy blocks are not remote failures
        assert_eq!(dispatcher.remote_state("cart").failure_count, 0);
    }

    #[tokio::test]
    async fn test_pre_request_redirects_to_alternate() {
        let dispatcher = LifecycleDispatcher::new(config());

        let recovery = dispatcher
            .on_failure(LoadFailure::new("foo", LoadStage::PreRequest))
            .await;

        match recovery {
            Recovery::Request(request) => {
                assert_eq!(request.remote_id, "foo");
                assert_eq!(request.entry.as_deref(), Some(BACKUP_URL));
            }
            other => panic!("Expected request, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dependency_and_unknown_stages_use_placeholder() {
        let dispatcher = LifecycleDispatcher::new(ResilienceConfig::default());

        let deps = dispatcher
            .on_failure(failure("shop", LoadStage::DependencyResolution, "react mismatch"))
            .await;
        assert!(matches!(deps, Recovery::Artifact(_)));

        let unknown = dispatcher
            .on_failure(failure("shop", LoadStage::Unknown("warmup".into()), "odd"))
            .await;
        assert!(matches!(unknown, Recovery::Artifact(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_stage_yields_a_value() {
        let stages = [
            LoadStage::PreRequest,
            LoadStage::DescriptorLoad,
            LoadStage::DependencyResolution,
            LoadStage::ArtifactLoad,
            LoadStage::Unknown("mystery".into()),
        ];
        let dispatcher = dispatcher_with(CountingSource::new(None));

        // Closed, then open after enough failures
        for _ in 0..2 {
            for stage in &stages {
                let recovery = dispatcher.on_failure(LoadFailure::new("foo", stage.clone())).await;
                match (stage, &recovery) {
                    (LoadStage::ArtifactLoad, Recovery::Factory(_)) => {}
                    (LoadStage::PreRequest, Recovery::Request(_) | Recovery::Artifact(_)) => {}
                    (_, Recovery::Artifact(_)) => {}
                    (stage, other) => panic!("Unexpected {:?} for {}", other, stage),
                }
            }
        }
        assert!(dispatcher.breaker().is_open("foo"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_descriptor_recovered_from_alternate_source() {
        let source = CountingSource::new(Some(serde_json::json!({"exposes": ["./Widget"]})));
        let dispatcher = dispatcher_with(source.clone());

        let recovery = dispatcher
            .on_failure(failure("foo", LoadStage::DescriptorLoad, "manifest 404"))
            .await;

        match recovery {
            Recovery::Descriptor(descriptor) => {
                assert_eq!(descriptor.source_url, BACKUP_URL);
                assert_eq!(descriptor.body["exposes"][0], "./Widget");
            }
            other => panic!("Expected descriptor, got {:?}", other),
        }
        assert_eq!(source.calls(), 1);

        // The alternate success clears the dispatched failure
        assert_eq!(dispatcher.remote_state("foo").failure_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_alternate_source_exhaustion_falls_back() {
        let source = CountingSource::new(None);
        let dispatcher = dispatcher_with(source.clone());
        let original = RemoteError::load("manifest 404");

        let recovery = dispatcher
            .on_failure(LoadFailure::new("foo", LoadStage::DescriptorLoad).with_error(original.clone()))
            .await;

        let artifact = recovery.artifact().expect("placeholder artifact");
        assert_eq!(source.calls(), 2);

        // Keyed by the original failure, not the alternate one
        let cached = dispatcher.cache().get("foo", Some(&original)).await;
        assert!(cached.is_some_and(|c| Arc::ptr_eq(&c, &artifact)));

        // One host failure, one failure on the books
        assert_eq!(dispatcher.remote_state("foo").failure_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_alternate_source_failures_honor_threshold() {
        let source = CountingSource::new(None);
        let dispatcher = dispatcher_with(source.clone());

        for _ in 0..2 {
            dispatcher
                .on_failure(failure("foo", LoadStage::DescriptorLoad, "manifest 404"))
                .await;
        }
        assert!(!dispatcher.breaker().is_open("foo"));
        assert_eq!(dispatcher.remote_state("foo").failure_count, 2);

        dispatcher
            .on_failure(failure("foo", LoadStage::DescriptorLoad, "manifest 404"))
            .await;
        assert!(dispatcher.breaker().is_open("foo"));
        assert_eq!(source.calls(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_reset_timeout_still_recovers() {
        let config = ResilienceConfig::from_yaml(
            "circuitBreakerThreshold: 1\ncircuitBreakerResetTimeout: \"580000000000years\"",
        )
        .unwrap();
        let dispatcher = LifecycleDispatcher::builder().config(config).build().unwrap();

        let recovery = dispatcher
            .on_failure(failure("shop", LoadStage::DescriptorLoad, "503"))
            .await;

        assert!(recovery.artifact().is_some());
        assert!(dispatcher.breaker().is_open("shop"));

        let recovery = dispatcher
            .on_failure(failure("shop", LoadStage::ArtifactLoad, "503"))
            .await;
        assert_eq!(recovery.kind(), "factory");
    }

    async fn engine_log_targets(logging: bool) -> Vec<String> {
        let captured = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let subscriber =
            tracing_subscriber::registry().with(CaptureTargets(Arc::clone(&captured)));
        let _guard = tracing::subscriber::set_default(subscriber);

        let source = CountingSource::new(None);
        let dispatcher = LifecycleDispatcher::builder()
            .config(config().with_logging(logging))
            .source(source)
            .build()
            .unwrap();

        dispatcher.initialize(&HostInit::new(["foo"]));
        for _ in 0..3 {
            dispatcher
                .on_failure(failure("foo", LoadStage::DescriptorLoad, "manifest 404"))
                .await;
        }
        let gate = dispatcher.gate(RemoteRequest::new("foo"));
        assert!(!gate.is_proceed());
        dispatcher.on_success("foo");

        let targets = captured.lock().clone();
        targets
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_logging_silences_engine() {
        assert!(engine_log_targets(false).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_enabled_logging_reports_each_component() {
        let targets = engine_log_targets(true).await;

        for component in ["dispatcher", "registry", "retry"] {
            assert!(
                targets.iter().any(|t| t.ends_with(component)),
                "no {} events in {:?}",
                component,
                targets
            );
        }
    }

    #[tokio::test]
    async fn test_dispatched_failures_open_circuit() {
        let dispatcher = LifecycleDispatcher::new(ResilienceConfig::default().with_threshold(3));

        for _ in 0..3 {
            dispatcher
                .on_failure(failure("shop", LoadStage::DependencyResolution, "boom"))
                .await;
        }

        assert!(dispatcher.breaker().is_open("shop"));
        let state = dispatcher.remote_state("shop");
        assert_eq!(state.failure_count, 3);
        assert!(state.circuit_open);
    }

    #[tokio::test]
    async fn test_success_resets_remote() {
        let dispatcher = LifecycleDispatcher::new(ResilienceConfig::default().with_threshold(2));

        for _ in 0..2 {
            dispatcher
                .on_failure(failure("shop", LoadStage::ArtifactLoad, "boom"))
                .await;
        }
        assert!(dispatcher.breaker().is_open("shop"));

        dispatcher.on_success("shop");
        dispatcher.on_success("shop");

        let state = dispatcher.remote_state("shop");
        assert_eq!(state.failure_count, 0);
        assert!(!dispatcher.breaker().is_open("shop"));
    }

    #[tokio::test]
    async fn test_gate_rejection_round_trip() {
        let dispatcher = LifecycleDispatcher::new(ResilienceConfig::default().with_threshold(1));
        let hooks: &dyn LoadHooks = &dispatcher;

        assert!(hooks.before_request(RemoteRequest::new("shop")).await.is_proceed());

        hooks
            .on_load_error(failure("shop", LoadStage::DescriptorLoad, "503"))
            .await;

        let gate = hooks.before_request(RemoteRequest::new("shop")).await;
        let reason = match gate {
            RequestGate::Rejected { reason, .. } => reason,
            other => panic!("Expected rejection, got {:?}", other),
        };

        // The host feeds the rejection back and gets a placeholder
        let recovery = hooks
            .on_load_error(LoadFailure::new("shop", LoadStage::PreRequest).with_error(reason))
            .await;
        assert!(matches!(recovery, Recovery::Artifact(_)));
        assert_eq!(dispatcher.remote_state("shop").failure_count, 1);
    }

    #[tokio::test]
    async fn test_dispatchers_do_not_share_state() {
        let first = LifecycleDispatcher::new(ResilienceConfig::default().with_threshold(1));
        let second = LifecycleDispatcher::new(ResilienceConfig::default().with_threshold(1));

        first
            .on_failure(failure("shop", LoadStage::DescriptorLoad, "down"))
            .await;

        assert!(first.breaker().is_open("shop"));
        assert!(!second.breaker().is_open("shop"));
        assert!(second.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_custom_fallback_for_remote() {
        let config = ResilienceConfig::default()
            .with_fallback("nav", serde_json::json!({"links": ["home"]}));
        let dispatcher = LifecycleDispatcher::new(config);

        let recovery = dispatcher
            .on_failure(failure("nav", LoadStage::ArtifactLoad, "chunk failed"))
            .await;

        let artifact = recovery.artifact().unwrap();
        assert_eq!(
            *artifact,
            FallbackArtifact::custom("nav", serde_json::json!({"links": ["home"]}))
        );
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = LifecycleDispatcher::builder()
            .config(ResilienceConfig::default().with_threshold(0))
            .build();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_init_accepts_host_remotes() {
        let dispatcher = LifecycleDispatcher::new(config());
        let hooks: &dyn LoadHooks = &dispatcher;

        hooks.init(&HostInit::new(["foo", "bar"]));
        assert_eq!(hooks.name(), "remote-guard");
        assert!(dispatcher.snapshot().is_empty());
    }
}
