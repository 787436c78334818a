//! Cache backend lifecycle events

/// Connectivity event emitted by a [`CacheBackend`](crate::CacheBackend).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// The backend is connected and accepting commands.
    Ready,
    /// The connection was closed and will not be reused.
    End,
    /// The backend reported an error; its state is unknown.
    Error(String),
}

impl CacheEvent {
    /// Short label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheEvent::Ready => "ready",
            CacheEvent::End => "end",
            CacheEvent::Error(_) => "error",
        }
    }
}
