//! Per-request context shared with resolver methods.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use graphbind_sessions::{Session, SessionStore};

/// State attached to one GraphQL request: the caller's session (if the
/// cookie named a live one), the request headers, and a slot resolvers fill
/// to establish a new session (the transport turns it into a cookie).
pub struct RequestContext {
    session_id: Option<String>,
    session: Option<Session>,
    headers: http::HeaderMap,
    sessions: Arc<SessionStore>,
    new_session: Mutex<Option<Session>>,
}

impl RequestContext {
    /// Bind a request to its session. An expired or unknown cookie id is
    /// treated as no session at all.
    pub fn new(
        sessions: Arc<SessionStore>,
        cookie_session_id: Option<String>,
        headers: http::HeaderMap,
    ) -> Self {
        let session = cookie_session_id.as_deref().and_then(|id| sessions.get(id));
        let session_id = session.as_ref().map(|s| s.id().to_string());
        Self {
            session_id,
            session,
            headers,
            sessions,
            new_session: Mutex::new(None),
        }
    }

    /// Context for engine-only execution with no transport attached.
    pub fn detached() -> Self {
        Self::new(Arc::new(SessionStore::new()), None, http::HeaderMap::new())
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn headers(&self) -> &http::HeaderMap {
        &self.headers
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Create a session and stage it for the response cookie. Calling twice
    /// keeps the last session; earlier ones stay in the store until they
    /// expire or are deleted.
    pub fn begin_session(&self, max_age: Duration) -> Session {
        let session = self.sessions.create(max_age);
        let mut slot = self.new_session.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(session.clone());
        session
    }

    /// Drop the caller's current session, if any.
    pub fn end_session(&self) {
        if let Some(id) = self.session_id.as_deref() {
            self.sessions.delete(id);
        }
    }

    /// Session staged by `begin_session` during this request.
    pub fn new_session(&self) -> Option<Session> {
        let slot = self.new_session.lock().unwrap_or_else(|e| e.into_inner());
        slot.clone()
    }
}
