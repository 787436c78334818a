//! In-process cache backend.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::future::join_all;
use moka::future::Cache;
use tokio::sync::broadcast;

use crate::config::MokaCacheConfig;
use crate::traits::CacheBackend;
use crate::types::{CacheEvent, PrefixDeletion};
use crate::{MuninnError, Result};

/// [`CacheBackend`] backed by a bounded moka cache.
///
/// Entries have no TTL; they live until deleted or evicted for capacity.
/// The backend starts out ready. [`emit`](Self::emit) records a lifecycle
/// change and broadcasts it, which is how connectivity loss is simulated.
/// While not ready, `get`, `set` and `delete_by_prefix` fail.
pub struct MokaCacheBackend {
    entries: Cache<String, String>,
    events: broadcast::Sender<CacheEvent>,
    ready: AtomicBool,
}

impl MokaCacheBackend {
    /// Create a backend with default capacity (10,000 entries).
    pub fn new() -> Self {
        Self::with_config(&MokaCacheConfig::default())
    }

    pub fn with_config(config: &MokaCacheConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            entries: Cache::new(config.max_entries),
            events,
            ready: AtomicBool::new(true),
        }
    }

    /// Record a lifecycle event and broadcast it to every subscriber.
    pub fn emit(&self, event: CacheEvent) {
        self.ready
            .store(event == CacheEvent::Ready, Ordering::Release);
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Keys currently stored, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.as_ref().clone()).collect()
    }

    /// Read an entry regardless of readiness.
    pub async fn peek(&self, key: &str) -> Option<String> {
        self.entries.get(key).await
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(MuninnError::Cache("backend not connected".to_string()))
        }
    }
}

impl Default for MokaCacheBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for MokaCacheBackend {
    fn name(&self) -> &str {
        "moka"
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.ensure_ready()?;
        Ok(self.entries.get(key).await)
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.ensure_ready()?;
        self.entries.insert(key.to_string(), value).await;
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<PrefixDeletion> {
        self.ensure_ready()?;
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.as_ref().clone())
            .collect();
        let removed = join_all(keys.iter().map(|k| self.entries.remove(k))).await;
        Ok(PrefixDeletion {
            matched: keys.len() as u64,
            deleted: removed.iter().filter(|r| r.is_some()).count() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get() {
        let backend = MokaCacheBackend::new();
        backend.set("k", "v".into()).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Some("v".to_string()));
        assert_eq!(backend.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_by_prefix_only_touches_prefix() {
        let backend = MokaCacheBackend::new();
        backend.set("widgets_{a}", "1".into()).await.unwrap();
        backend.set("widgets_{b}", "2".into()).await.unwrap();
        backend.set("gadgets_{a}", "3".into()).await.unwrap();

        let deletion = backend.delete_by_prefix("widgets_{").await.unwrap();
        assert_eq!(deletion, PrefixDeletion { matched: 2, deleted: 2 });
        assert_eq!(backend.get("widgets_{a}").await.unwrap(), None);
        assert_eq!(backend.get("gadgets_{a}").await.unwrap(), Some("3".into()));
    }

    #[tokio::test]
    async fn not_ready_rejects_commands() {
        let backend = MokaCacheBackend::new();
        backend.set("k", "v".into()).await.unwrap();
        backend.emit(CacheEvent::End);

        assert!(!backend.is_ready());
        assert!(matches!(backend.get("k").await, Err(MuninnError::Cache(_))));
        assert_eq!(backend.peek("k").await, Some("v".to_string()));

        backend.emit(CacheEvent::Ready);
        assert_eq!(backend.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn subscribers_receive_events() {
        let backend = MokaCacheBackend::new();
        let mut a = backend.subscribe();
        let mut b = backend.subscribe();
        backend.emit(CacheEvent::Error("reset".into()));
        assert_eq!(a.recv().await.unwrap(), CacheEvent::Error("reset".into()));
        assert_eq!(b.recv().await.unwrap(), CacheEvent::Error("reset".into()));
    }
}
