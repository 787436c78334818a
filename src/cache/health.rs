//! Cache health tracking.
//!
//! [`CacheHealthMonitor`] follows a backend's lifecycle events and exposes
//! a single "caching enabled" flag. The decision logic is the transition
//! table on [`HealthState`]; the monitor only feeds events into it.
//!
//! ```text
//!              ready                     end | error
//!   Disabled ─────────►  Enabled  ─────────────────►  Disabled
//!      ▲ │ end | error      │ ▲ ready
//!      └─┘                  └─┘
//! ```
//!
//! The initial state comes from [`CacheBackend::is_ready`] at attachment
//! time. If the monitor falls behind the event channel it re-reads
//! `is_ready`; if the channel closes it disables caching for good.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{info, warn};

use crate::CacheBackend;
use crate::telemetry;
use crate::types::CacheEvent;

/// Whether reads may consult the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Enabled,
    Disabled,
}

impl HealthState {
    pub fn from_ready(ready: bool) -> Self {
        if ready {
            HealthState::Enabled
        } else {
            HealthState::Disabled
        }
    }

    /// Transition table. Any event other than `Ready` means the cache can
    /// no longer be trusted.
    pub fn on_event(self, event: &CacheEvent) -> Self {
        match event {
            CacheEvent::Ready => HealthState::Enabled,
            CacheEvent::End | CacheEvent::Error(_) => HealthState::Disabled,
        }
    }

    pub fn is_enabled(self) -> bool {
        self == HealthState::Enabled
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthState::Enabled => "enabled",
            HealthState::Disabled => "disabled",
        }
    }
}

/// Tracks one backend's connectivity for one collection.
///
/// The flag is the only mutable state shared between in-flight operations
/// and the event watcher. Readers see the latest stored value; a flip in
/// the middle of an operation costs at most one skipped or stale cache
/// interaction.
pub struct CacheHealthMonitor {
    enabled: Arc<AtomicBool>,
    watcher: Option<JoinHandle<()>>,
}

impl CacheHealthMonitor {
    /// Subscribe to `backend` and start watching its events.
    ///
    /// The watcher runs on the current tokio runtime. Outside a runtime no
    /// events can be observed, so caching starts (and stays) disabled.
    pub fn attach(backend: Arc<dyn CacheBackend>) -> Self {
        let events = backend.subscribe();
        let initial = HealthState::from_ready(backend.is_ready());
        let enabled = Arc::new(AtomicBool::new(initial.is_enabled()));

        let watcher = match tokio::runtime::Handle::try_current() {
            Ok(handle) => Some(handle.spawn(watch(backend, events, Arc::clone(&enabled)))),
            Err(_) => {
                warn!(
                    backend = backend.name(),
                    "no tokio runtime, cache health cannot be tracked; caching disabled"
                );
                enabled.store(false, Ordering::Release);
                None
            }
        };

        Self { enabled, watcher }
    }

    /// Current state.
    pub fn state(&self) -> HealthState {
        HealthState::from_ready(self.is_enabled())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Feed an event through the transition table and return the new state.
    pub fn apply(&self, event: &CacheEvent) -> HealthState {
        let next = self.state().on_event(event);
        store_state(&self.enabled, next, event.as_str());
        next
    }
}

impl Drop for CacheHealthMonitor {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

impl std::fmt::Debug for CacheHealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheHealthMonitor")
            .field("state", &self.state())
            .field("watching", &self.watcher.is_some())
            .finish()
    }
}

async fn watch(
    backend: Arc<dyn CacheBackend>,
    events: broadcast::Receiver<CacheEvent>,
    enabled: Arc<AtomicBool>,
) {
    let mut events = BroadcastStream::new(events);
    while let Some(item) = events.next().await {
        match item {
            Ok(event) => {
                let current = HealthState::from_ready(enabled.load(Ordering::Acquire));
                if let CacheEvent::Error(message) = &event {
                    warn!(backend = backend.name(), error = %message, "cache backend error");
                }
                store_state(&enabled, current.on_event(&event), event.as_str());
            }
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(
                    backend = backend.name(),
                    skipped, "missed cache lifecycle events, resyncing"
                );
                store_state(
                    &enabled,
                    HealthState::from_ready(backend.is_ready()),
                    "resync",
                );
            }
        }
    }
    store_state(&enabled, HealthState::Disabled, "closed");
}

fn store_state(flag: &AtomicBool, next: HealthState, cause: &str) {
    let previous = flag.swap(next.is_enabled(), Ordering::AcqRel);
    if previous != next.is_enabled() {
        info!(state = next.as_str(), cause, "cache health changed");
        metrics::counter!(telemetry::HEALTH_TRANSITIONS_TOTAL, "state" => next.as_str())
            .increment(1);
    }
}
