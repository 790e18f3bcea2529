//! In-memory conversation sessions.
//!
//! The store maps a caller-supplied key to a [`Session`]. The map itself is
//! behind an `RwLock` that is only held for lookup and insert; each session
//! has its own async mutex so a whole conversation turn can hold it across
//! the upstream call without blocking other keys.

use crate::provider::{Message, Role};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

/// Messages kept per session after each turn.
pub const MAX_HISTORY: usize = 10;

/// Session key used when the caller does not name one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Shared, individually lockable session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Chronological message history for one session key.
#[derive(Debug, Clone)]
pub struct Session {
    key: String,
    messages: Vec<Message>,
    created_at: DateTime<Utc>,
    last_active: Instant,
}

impl Session {
    /// Create an empty session.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            messages: Vec::new(),
            created_at: Utc::now(),
            last_active: Instant::now(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_active(&self) -> Instant {
        self.last_active
    }

    /// Append a message at the end of the history.
    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message::new(role, content));
        self.last_active = Instant::now();
    }

    /// Keep only the newest `max_len` messages.
    ///
    /// Drops individual messages from the front, so a user/assistant pair can
    /// be split when the history holds an odd number of entries.
    pub fn trim(&mut self, max_len: usize) {
        if self.messages.len() > max_len {
            let excess = self.messages.len() - max_len;
            self.messages.drain(..excess);
        }
    }

    /// Whether the session has seen no activity for longer than `max_idle`.
    pub fn is_idle(&self, now: Instant, max_idle: Duration) -> bool {
        now.saturating_duration_since(self.last_active) > max_idle
    }
}

/// Process-wide registry of sessions.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session for `key`, registering an empty one if absent.
    pub async fn get_or_create(&self, key: &str) -> SessionHandle {
        if let Some(handle) = self.sessions.read().await.get(key) {
            return handle.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(key.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id = %key, "Creating session");
                Arc::new(Mutex::new(Session::new(key)))
            })
            .clone()
    }

    /// Append a message to the session for `key`.
    pub async fn append(&self, key: &str, role: Role, content: impl Into<String>) {
        let handle = self.get_or_create(key).await;
        handle.lock().await.push(role, content);
    }

    /// Trim the session for `key` to its newest `max_len` messages.
    pub async fn trim(&self, key: &str, max_len: usize) {
        let handle = self.get_or_create(key).await;
        handle.lock().await.trim(max_len);
    }

    /// Number of distinct session keys tracked.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Snapshot of the history for `key`, if the session exists.
    pub async fn messages(&self, key: &str) -> Option<Vec<Message>> {
        let handle = self.sessions.read().await.get(key).cloned()?;
        let session = handle.lock().await;
        Some(session.messages().to_vec())
    }

    /// All tracked session keys, in no particular order.
    pub async fn keys(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    /// Forget the session for `key`. Returns whether it existed.
    pub async fn remove(&self, key: &str) -> bool {
        self.sessions.write().await.remove(key).is_some()
    }

    /// Drop sessions idle for longer than `max_idle`.
    ///
    /// Sessions locked by an in-flight turn are kept. Returns the number of
    /// sessions removed.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) if session.is_idle(now, max_idle) => {
                tracing::debug!(
                    session_id = %session.key(),
                    created_at = %session.created_at(),
                    messages = session.len(),
                    "Evicting idle session"
                );
                false
            }
            _ => true,
        });

        before - sessions.len()
    }
}

/// Periodically evict idle sessions until the task is aborted.
pub fn spawn_eviction_task(
    store: Arc<SessionStore>,
    max_idle: Duration,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);

        loop {
            interval.tick().await;
            let evicted = store.evict_idle(max_idle).await;
            if evicted > 0 {
                let remaining = store.count().await;
                tracing::info!(evicted, remaining, "Evicted idle sessions");
            }
        }
    })
}
