//! Per-thread transcript sessions and their store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::assistant::MessageRole;

/// Default session timeout (30 minutes).
const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// One recorded message of a conversation.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    /// Author of the message.
    pub role: MessageRole,
    /// Literal message text.
    pub text: String,
}

/// The transcript of a single conversation thread.
///
/// Sessions record messages in exchange order (user message first, then the
/// assistant reply) and track activity for expiry cleanup.
#[derive(Debug)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// Remote thread id this transcript mirrors.
    thread_id: String,
    /// Recorded messages.
    messages: RwLock<Vec<TranscriptEntry>>,
    /// Session creation time.
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
    /// Last activity time.
    last_activity: RwLock<DateTime<Utc>>,
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Session {
    fn new(thread_id: String) -> Self {
        let now = Utc::now();
        Self {
            inner: Arc::new(SessionInner {
                thread_id,
                messages: RwLock::new(Vec::new()),
                created_at: now,
                last_activity: RwLock::new(now),
            }),
        }
    }

    /// Get the remote thread id.
    #[must_use]
    pub fn thread_id(&self) -> &str {
        &self.inner.thread_id
    }

    /// Record a user message.
    pub fn add_user_message(&self, text: impl Into<String>) {
        self.add_entry(TranscriptEntry {
            role: MessageRole::User,
            text: text.into(),
        });
    }

    /// Record an assistant reply.
    pub fn add_assistant_message(&self, text: impl Into<String>) {
        self.add_entry(TranscriptEntry {
            role: MessageRole::Assistant,
            text: text.into(),
        });
    }

    /// Record a transcript entry.
    pub fn add_entry(&self, entry: TranscriptEntry) {
        let mut guard = self.inner.messages.write().unwrap();
        guard.push(entry);
        drop(guard);
        self.touch();
    }

    /// Get all recorded messages in exchange order.
    #[must_use]
    pub fn messages(&self) -> Vec<TranscriptEntry> {
        self.inner.messages.read().unwrap().clone()
    }

    /// Get the number of recorded messages.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.inner.messages.read().unwrap().len()
    }

    /// Update the last activity timestamp.
    fn touch(&self) {
        let mut guard = self.inner.last_activity.write().unwrap();
        *guard = Utc::now();
    }

    /// Check if the session has been inactive longer than the timeout.
    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        let last = *self.inner.last_activity.read().unwrap();
        let now = Utc::now();
        if let Ok(duration) = (now - last).to_std() {
            duration > timeout
        } else {
            // Negative duration means clock skew or "last" is in future.
            false
        }
    }
}

/// Thread-safe store of transcript sessions, keyed by remote thread id.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug)]
struct SessionStoreInner {
    sessions: RwLock<HashMap<String, Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create a new session store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Get a session by thread id.
    #[must_use]
    pub fn get(&self, thread_id: &str) -> Option<Session> {
        let guard = self.inner.sessions.read().unwrap();
        guard.get(thread_id).cloned()
    }

    /// Get a session by thread id, creating it if it doesn't exist.
    #[must_use]
    pub fn get_or_create(&self, thread_id: &str) -> Session {
        // Try read-only first
        {
            let guard = self.inner.sessions.read().unwrap();
            if let Some(session) = guard.get(thread_id) {
                return session.clone();
            }
        }

        let session = Session::new(thread_id.to_string());
        let mut guard = self.inner.sessions.write().unwrap();
        guard
            .entry(thread_id.to_string())
            .or_insert(session)
            .clone()
    }

    /// Remove a session by thread id.
    pub fn remove(&self, thread_id: &str) -> Option<Session> {
        let mut guard = self.inner.sessions.write().unwrap();
        guard.remove(thread_id)
    }

    /// Get the number of active sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.sessions.read().unwrap().len()
    }

    /// Check if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all sessions inactive past the default timeout.
    ///
    /// Returns the number of sessions removed.
    #[allow(dead_code)]
    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_with_timeout(DEFAULT_SESSION_TIMEOUT)
    }

    /// Remove sessions that have been inactive longer than the timeout.
    pub fn cleanup_expired_with_timeout(&self, timeout: Duration) -> usize {
        let mut guard = self.inner.sessions.write().unwrap();
        let before = guard.len();
        guard.retain(|_, session| !session.is_expired_with_timeout(timeout));
        before - guard.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_records_exchange_order() {
        let store = SessionStore::new();
        let session = store.get_or_create("thread-abc");

        assert_eq!(session.thread_id(), "thread-abc");
        assert_eq!(session.message_count(), 0);

        session.add_user_message("Hello");
        session.add_assistant_message("Hi there!");

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].text, "Hello");
        assert_eq!(messages[1].role, MessageRole::Assistant);
    }

    #[test]
    fn test_get_or_create_reuses_thread_session() {
        let store = SessionStore::new();

        let first = store.get_or_create("thread-1");
        first.add_user_message("one");

        let second = store.get_or_create("thread-1");
        assert_eq!(second.message_count(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_session_store_remove() {
        let store = SessionStore::new();
        assert!(store.is_empty());

        let _ = store.get_or_create("thread-1");
        assert_eq!(store.len(), 1);

        store.remove("thread-1");
        assert!(store.is_empty());
    }

    #[test]
    fn test_cleanup_keeps_active_sessions() {
        let store = SessionStore::new();
        let session = store.get_or_create("thread-1");
        session.add_user_message("keep me");

        let removed = store.cleanup_expired_with_timeout(Duration::from_secs(60));
        assert_eq!(removed, 0);
        assert_eq!(store.len(), 1);

        let removed = store.cleanup_expired_with_timeout(Duration::from_secs(0));
        assert_eq!(removed, 1);
        assert!(store.is_empty());
    }
}
