//! Server-side session slots.
//!
//! Only what the token store needs: an opaque id and a string map with
//! atomic insert-if-absent.
//!
//! # Lifecycle
//! ```text
//! open(cookie)  → known, not idle: reuse (last-seen refreshed)
//!               → otherwise: detached session, not stored
//! handler writes a slot (e.g. issues a CSRF token)
//! persist()     → stored; capacity enforced by evicting idle,
//!                 then least recently seen sessions
//! ```
//!
//! A request that never writes to its session leaves nothing behind.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::security::clock::{Clock, SystemClock};

/// Default idle lifetime of a stored session.
pub const DEFAULT_IDLE_TTL_SECS: u64 = 1440;

/// Default upper bound on stored sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Handle to one client's server-side storage. Clones share state.
#[derive(Debug, Clone)]
pub struct Session {
    id: Arc<str>,
    values: Arc<DashMap<String, String>>,
    last_seen: Arc<AtomicU64>,
}

impl Session {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            values: Arc::new(DashMap::new()),
            last_seen: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.value().clone())
    }

    /// Return the value for `key`, storing `init()` first if there is none.
    ///
    /// Concurrent callers on the same key all observe the one stored value.
    pub fn get_or_insert_with<F>(&self, key: &str, init: F) -> String
    where
        F: FnOnce() -> String,
    {
        self.values.entry(key.to_string()).or_insert_with(init).value().clone()
    }

    /// Whether nothing has been written to this session.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn touch(&self, now: u64) {
        self.last_seen.store(now, Ordering::Relaxed);
    }

    fn last_seen(&self) -> u64 {
        self.last_seen.load(Ordering::Relaxed)
    }
}

/// Registry of live sessions by id, bounded in size and idle time.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    clock: Arc<dyn Clock>,
    idle_ttl_secs: u64,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_limits(Arc::new(SystemClock), DEFAULT_IDLE_TTL_SECS, DEFAULT_MAX_SESSIONS)
    }

    pub fn with_limits(clock: Arc<dyn Clock>, idle_ttl_secs: u64, max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            clock,
            idle_ttl_secs,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Resolve a client-presented id, or start a detached session.
    ///
    /// Unknown and idle-expired ids are never adopted. Returns the session and
    /// whether it is new; a new session is only stored by `persist`.
    pub fn open(&self, presented: Option<&str>) -> (Session, bool) {
        let now = self.clock.now_unix();
        if let Some(id) = presented {
            // Clone out first: the map guard must be gone before `remove_if`.
            let known = self.sessions.get(id).map(|s| s.value().clone());
            if let Some(session) = known {
                if !self.is_idle(&session, now) {
                    session.touch(now);
                    return (session, false);
                }
                self.sessions.remove_if(id, |_, s| self.is_idle(s, now));
            }
        }

        let session = Session::new(Uuid::new_v4().simple().to_string());
        session.touch(now);
        (session, true)
    }

    /// Store `session` so later requests can resolve its id.
    pub fn persist(&self, session: &Session) {
        if self.sessions.contains_key(session.id()) {
            return;
        }
        if self.sessions.len() >= self.max_sessions {
            self.sweep_idle();
        }
        if self.sessions.len() >= self.max_sessions {
            self.evict_least_recent();
        }
        session.touch(self.clock.now_unix());
        self.sessions.insert(session.id().to_string(), session.clone());
        tracing::debug!(live = self.sessions.len(), "New session stored");
    }

    /// Drop sessions idle for longer than the configured lifetime.
    pub fn sweep_idle(&self) -> usize {
        let now = self.clock.now_unix();
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !self.is_idle(s, now));
        before.saturating_sub(self.sessions.len())
    }

    fn evict_least_recent(&self) {
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|s| s.value().last_seen())
            .map(|s| s.key().clone());
        if let Some(id) = oldest {
            self.sessions.remove(&id);
            tracing::debug!(max = self.max_sessions, "Session store full, evicted least recent session");
        }
    }

    fn is_idle(&self, session: &Session, now: u64) -> bool {
        now.saturating_sub(session.last_seen()) > self.idle_ttl_secs
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("live", &self.sessions.len())
            .field("idle_ttl_secs", &self.idle_ttl_secs)
            .field("max_sessions", &self.max_sessions)
            .finish()
    }
}
