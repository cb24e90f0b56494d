use std::{
    collections::HashMap,
    sync::{Arc, RwLock, Weak},
    time::{Duration, Instant},
};

use dashmap::DashMap;

struct SessionInner {
    id: String,
    created_at: Instant,
    max_age: Duration,
    values: RwLock<HashMap<String, serde_json::Value>>,
}

/// Handle to a live session. Cloning is cheap and all clones observe the
/// same value map.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    fn new(max_age: Duration) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id: uuid::Uuid::new_v4().to_string(),
                created_at: Instant::now(),
                max_age,
                values: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Opaque session identifier (uuid v4), used as the cookie value.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn max_age(&self) -> Duration {
        self.inner.max_age
    }

    /// Age-based expiry check. Reads/writes never renew the TTL.
    pub fn is_expired(&self) -> bool {
        self.inner.created_at.elapsed() > self.inner.max_age
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let values = self
            .inner
            .values
            .read()
            .unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    /// Last write wins under concurrent sets.
    pub fn set(&self, key: impl Into<String>, value: serde_json::Value) {
        let mut values = self
            .inner
            .values
            .write()
            .unwrap_or_else(|e| e.into_inner());
        values.insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<serde_json::Value> {
        let mut values = self
            .inner
            .values
            .write()
            .unwrap_or_else(|e| e.into_inner());
        values.remove(key)
    }
}

/// Concurrent session map keyed by session id.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with the given TTL and register it under its id.
    pub fn create(&self, max_age: Duration) -> Session {
        let session = Session::new(max_age);
        self.sessions
            .insert(session.id().to_string(), session.clone());
        tracing::debug!(session_id = %session.id(), max_age_secs = max_age.as_secs(), "session created");
        session
    }

    /// Look up a session, treating expired entries as absent. The first
    /// lookup past the deadline removes the entry.
    pub fn get(&self, id: &str) -> Option<Session> {
        let session = self.sessions.get(id).map(|entry| entry.clone())?;
        if session.is_expired() {
            self.sessions.remove(id);
            tracing::debug!(session_id = %id, "session expired on lookup");
            return None;
        }
        Some(session)
    }

    /// Remove a session. Idempotent; removing an unknown id is a no-op.
    pub fn delete(&self, id: &str) {
        self.sessions.remove(id);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired());
        before - self.sessions.len()
    }

    /// Spawn a background task that periodically evicts expired sessions.
    /// The task holds only a weak reference and exits once the store is
    /// dropped.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let evicted = store.evict_expired();
                if evicted > 0 {
                    tracing::debug!(evicted, "swept expired sessions");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use {super::*, serde_json::json};

    #[test]
    fn test_create_and_get() {
        let store = SessionStore::new();
        let session = store.create(Duration::from_secs(60));

        let found = store.get(session.id()).unwrap();
        assert_eq!(found.id(), session.id());
        assert!(store.get("no-such-id").is_none());
    }

    #[test]
    fn test_values_shared_across_handles() {
        let store = SessionStore::new();
        let session = store.create(Duration::from_secs(60));
        session.set("user", json!({"name": "ada"}));

        let again = store.get(session.id()).unwrap();
        assert_eq!(again.get("user").unwrap()["name"], "ada");
        assert!(again.get("missing").is_none());
    }

    #[test]
    fn test_set_overwrites() {
        let store = SessionStore::new();
        let session = store.create(Duration::from_secs(60));

        session.set("k", json!(1));
        session.set("k", json!(2));
        assert_eq!(session.get("k").unwrap(), json!(2));

        assert_eq!(session.remove("k").unwrap(), json!(2));
        assert!(session.get("k").is_none());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = SessionStore::new();
        let session = store.create(Duration::from_secs(60));

        store.delete(session.id());
        assert!(store.get(session.id()).is_none());
        // Second delete of the same id is a no-op.
        store.delete(session.id());
        store.delete("never-existed");
    }

    #[tokio::test]
    async fn test_expired_session_is_absent() {
        let store = SessionStore::new();
        let session = store.create(Duration::from_millis(10));
        let id = session.id().to_string();

        assert!(store.get(&id).is_some());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(store.get(&id).is_none());
        // Lazy expiry also removed the entry.
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_evict_expired_keeps_live_sessions() {
        let store = SessionStore::new();
        let short = store.create(Duration::from_millis(10));
        let long = store.create(Duration::from_secs(60));

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.evict_expired(), 1);
        assert!(store.get(short.id()).is_none());
        assert!(store.get(long.id()).is_some());
    }

    #[tokio::test]
    async fn test_sweeper_evicts_in_background() {
        let store = Arc::new(SessionStore::new());
        let session = store.create(Duration::from_millis(10));
        let handle = store.start_sweeper(Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(store.len(), 0);
        assert!(store.get(session.id()).is_none());

        handle.abort();
    }
}
