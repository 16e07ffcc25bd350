//! Per-remote health state.
//!
//! The registry owns one [`RemoteState`] per remote and performs the
//! Closed → Open transition when consecutive failures reach the threshold.
//! An open circuit is closed again by a blind timed reset: a tokio task
//! scheduled at the moment the circuit opens. Each open bumps a generation
//! counter and the task only resets the generation it was scheduled for, so
//! a late-firing task never closes a newer open. Without a tokio runtime the
//! same deadline is applied lazily on the next access.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use remote_guard_core::{RemoteState, ResilienceConfig};

type Entries = RwLock<HashMap<String, RemoteEntry>>;

/// Sink for load outcomes.
///
/// The retry executor reports through this trait so it stays independent of
/// how health is tracked.
pub trait HealthRecorder: Send + Sync {
    /// A load of the remote succeeded.
    fn record_success(&self, remote_id: &str);

    /// A load of the remote failed.
    fn record_failure(&self, remote_id: &str);
}

struct RemoteEntry {
    state: RemoteState,

    /// When the pending blind reset is due, while the circuit is open
    reset_at: Option<Instant>,

    /// Bumped on every open
    generation: u64,

    reset_task: Option<AbortHandle>,
}

impl RemoteEntry {
    fn new(remote_id: &str) -> Self {
        Self {
            state: RemoteState::new(remote_id),
            reset_at: None,
            generation: 0,
            reset_task: None,
        }
    }

    fn close(&mut self) {
        self.state.failure_count = 0;
        self.state.circuit_open = false;
        self.reset_at = None;
        if let Some(task) = self.reset_task.take() {
            task.abort();
        }
    }

    fn is_open_at(&self, now: Instant) -> bool {
        self.state.circuit_open && self.reset_at.map_or(true, |at| now < at)
    }

    /// Apply an overdue reset. Returns true if the circuit was closed.
    fn expire_if_due(&mut self, now: Instant) -> bool {
        if self.state.circuit_open && !self.is_open_at(now) {
            self.close();
            true
        } else {
            false
        }
    }
}

/// Registry of remote health, one per dispatcher.
pub struct RemoteStateRegistry {
    entries: Arc<Entries>,
    threshold: u32,
    reset_timeout: Duration,
    breaker_enabled: bool,
    logging: bool,
}

impl RemoteStateRegistry {
    /// Create an empty registry.
    pub fn new(config: &ResilienceConfig) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            threshold: config.circuit_breaker_threshold.max(1),
            reset_timeout: config.circuit_breaker_reset_timeout,
            breaker_enabled: config.enable_circuit_breaker,
            logging: config.enable_logging,
        }
    }

    /// Current state of a remote, creating the default state if absent.
    pub fn get(&self, remote_id: &str) -> RemoteState {
        let mut entries = self.entries.write();
        let entry = entries
            .entry(remote_id.to_string())
            .or_insert_with(|| RemoteEntry::new(remote_id));

        if entry.expire_if_due(Instant::now()) {
            self.log_reset(remote_id);
        }

        entry.state.clone()
    }

    /// Whether the remote's circuit is open. Pure read.
    pub fn is_open(&self, remote_id: &str) -> bool {
        self.entries
            .read()
            .get(remote_id)
            .map(|entry| entry.is_open_at(Instant::now()))
            .unwrap_or(false)
    }

    /// Record a successful load: clears failures and closes the circuit.
    pub fn record_success(&self, remote_id: &str) {
        let mut entries = self.entries.write();
        let entry = entries
            .entry(remote_id.to_string())
            .or_insert_with(|| RemoteEntry::new(remote_id));

        let was_open = entry.state.circuit_open;
        entry.close();

        if was_open && self.logging {
            tracing::info!(remote_id = %remote_id, "Circuit closed after successful load");
        }
    }

    /// Record a failed load, opening the circuit once the threshold is hit.
    ///
    /// Returns the state after the update.
    pub fn record_failure(&self, remote_id: &str) -> RemoteState {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let entry = entries
            .entry(remote_id.to_string())
            .or_insert_with(|| RemoteEntry::new(remote_id));

        if entry.expire_if_due(now) {
            self.log_reset(remote_id);
        }

        entry.state.failure_count = entry.state.failure_count.saturating_add(1);
        entry.state.last_failure_time = Some(Utc::now());

        if self.breaker_enabled
            && !entry.state.circuit_open
            && entry.state.failure_count >= self.threshold
        {
            entry.state.circuit_open = true;
            entry.generation += 1;
            // A reset timeout past the clock's range means no timed reset
            let deadline = now.checked_add(self.reset_timeout);
            entry.reset_at = deadline;

            // Replace, never stack, the pending reset
            if let Some(previous) = entry.reset_task.take() {
                previous.abort();
            }
            entry.reset_task = deadline
                .and_then(|deadline| self.schedule_reset(remote_id, entry.generation, deadline));

            if self.logging {
                tracing::warn!(
                    remote_id = %remote_id,
                    failures = entry.state.failure_count,
                    reset_after = %humantime::format_duration(self.reset_timeout),
                    "Circuit opened after repeated failures"
                );
            }
        }

        entry.state.clone()
    }

    /// Every known remote, sorted by id.
    pub fn snapshot(&self) -> Vec<RemoteState> {
        let now = Instant::now();
        let entries = self.entries.read();
        let mut states: Vec<RemoteState> = entries
            .values()
            .map(|entry| {
                let mut state = entry.state.clone();
                if state.circuit_open && !entry.is_open_at(now) {
                    state.failure_count = 0;
                    state.circuit_open = false;
                }
                state
            })
            .collect();
        states.sort_by(|a, b| a.remote_id.cmp(&b.remote_id));
        states
    }

    /// Failures needed to open a circuit.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    fn schedule_reset(
        &self,
        remote_id: &str,
        generation: u64,
        deadline: Instant,
    ) -> Option<AbortHandle> {
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let entries: Weak<Entries> = Arc::downgrade(&self.entries);
        let remote_id = remote_id.to_string();
        let logging = self.logging;

        let task = runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(entries) = entries.upgrade() {
                reset_generation(&entries, &remote_id, generation, logging);
            }
        });

        Some(task.abort_handle())
    }

    fn log_reset(&self, remote_id: &str) {
        if self.logging {
            tracing::info!(remote_id = %remote_id, "Circuit reset after cooldown");
        }
    }
}

impl HealthRecorder for RemoteStateRegistry {
    fn record_success(&self, remote_id: &str) {
        RemoteStateRegistry::record_success(self, remote_id);
    }

    fn record_failure(&self, remote_id: &str) {
        RemoteStateRegistry::record_failure(self, remote_id);
    }
}

fn reset_generation(entries: &Entries, remote_id: &str, generation: u64, logging: bool) {
    let mut entries = entries.write();
    if let Some(entry) = entries.get_mut(remote_id) {
        if entry.generation == generation && entry.state.circuit_open {
            // The firing task owns this handle; drop it rather than abort it
            entry.reset_task = None;
            entry.close();
            if logging {
                tracing::info!(remote_id = %remote_id, "Circuit reset after cooldown");
            }
        }
    }
}

impl std::fmt::Debug for RemoteStateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStateRegistry")
            .field("remotes", &self.entries.read().len())
            .field("threshold", &self.threshold)
            .field("reset_timeout", &self.reset_timeout)
            .field("breaker_enabled", &self.breaker_enabled)
            .finish()
    }
}
