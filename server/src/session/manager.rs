//! Merge session manager.
//!
//! Tracks open merge sessions and the per-event write locks.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use frcstats_engine::{EventCode, GameCode, MergeState};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// (game code, event code) pair a session or lock is scoped to.
pub type EventKey = (GameCode, EventCode);

/// An in-progress merge.
#[derive(Debug, Clone)]
pub struct MergeSession {
    /// Unique identifier for this session
    pub id: String,
    pub game: GameCode,
    pub event_code: EventCode,
    /// Reconciled states, updated as resolutions arrive
    pub states: Vec<MergeState>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl MergeSession {
    pub fn event_key(&self) -> EventKey {
        (self.game.clone(), self.event_code.clone())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Holds an event's write lock. Dropping it releases the lock and forgets
/// the lock entry once nobody else holds or waits on it.
pub struct EventGuard<'a> {
    manager: &'a SessionManager,
    key: EventKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for EventGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.manager.prune_lock(&self.key);
    }
}

/// Session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("merge session not found: {0}")]
    NotFound(String),

    #[error("event {event} already has an open merge session ({session_id})")]
    EventBusy { event: String, session_id: String },
}

/// Manages open merge sessions.
///
/// Thread-safe and can be shared across handlers via `Arc`.
#[derive(Debug)]
pub struct SessionManager {
    /// All open sessions, keyed by session ID.
    sessions: DashMap<String, MergeSession>,
    /// Open session per event.
    by_event: DashMap<EventKey, String>,
    /// Write lock per event.
    event_locks: DashMap<EventKey, Arc<Mutex<()>>>,
    ttl: Duration,
}

impl SessionManager {
    /// Create a new session manager.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            by_event: DashMap::new(),
            event_locks: DashMap::new(),
            ttl,
        }
    }

    /// Create a new session manager wrapped in Arc for sharing.
    pub fn new_shared(ttl: Duration) -> Arc<Self> {
        Arc::new(Self::new(ttl))
    }

    /// Open a session for an event.
    ///
    /// Fails if the event already has a live session. An expired session is
    /// replaced.
    pub fn open(
        &self,
        game: GameCode,
        event_code: EventCode,
        states: Vec<MergeState>,
    ) -> Result<MergeSession, SessionError> {
        let now = Utc::now();
        let session = MergeSession {
            id: uuid::Uuid::new_v4().to_string(),
            game: game.clone(),
            event_code: event_code.clone(),
            states,
            created_at: now,
            expires_at: now + self.ttl,
        };

        // by_event is always locked before sessions, never the other way round
        match self.by_event.entry((game, event_code)) {
            Entry::Occupied(mut entry) => {
                let live = self
                    .sessions
                    .get(entry.get())
                    .map(|existing| !existing.is_expired(now))
                    .unwrap_or(false);
                if live {
                    return Err(SessionError::EventBusy {
                        event: format!("{}/{}", session.game, session.event_code),
                        session_id: entry.get().clone(),
                    });
                }
                let stale = entry.insert(session.id.clone());
                self.sessions.remove(&stale);
                tracing::info!(session = %stale, "Replaced expired merge session");
            }
            Entry::Vacant(entry) => {
                entry.insert(session.id.clone());
            }
        }

        self.sessions.insert(session.id.clone(), session.clone());
        tracing::info!(
            session = %session.id,
            game = %session.game,
            event = %session.event_code,
            states = session.states.len(),
            open_sessions = self.session_count(),
            "Merge session opened"
        );

        Ok(session)
    }

    /// Copy of a live session.
    pub fn get(&self, id: &str) -> Result<MergeSession, SessionError> {
        let session = self
            .sessions
            .get(id)
            .map(|s| s.clone())
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        if session.is_expired(Utc::now()) {
            self.close(id);
            return Err(SessionError::NotFound(id.to_string()));
        }
        Ok(session)
    }

    /// Replace a session's states.
    pub fn update_states(&self, id: &str, states: Vec<MergeState>) -> Result<(), SessionError> {
        let mut session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.states = states;
        Ok(())
    }

    /// Close a session. Returns it if it was open.
    pub fn close(&self, id: &str) -> Option<MergeSession> {
        let (_, session) = self.sessions.remove(id)?;
        let key = session.event_key();
        self.by_event.remove_if(&key, |_, open_id| open_id == id);
        self.prune_lock(&key);
        tracing::info!(session = %id, "Merge session closed");
        Some(session)
    }

    /// Fail with `EventBusy` while the event has a live session.
    ///
    /// Writes outside a session would leave the session's local rows stale.
    pub fn ensure_idle(&self, key: &EventKey) -> Result<(), SessionError> {
        let open_id = match self.by_event.get(key) {
            Some(id) => id.clone(),
            None => return Ok(()),
        };
        match self.get(&open_id) {
            Ok(_) => Err(SessionError::EventBusy {
                event: format!("{}/{}", key.0, key.1),
                session_id: open_id,
            }),
            // expired sessions are closed by get
            Err(_) => Ok(()),
        }
    }

    /// Wait for an event's write lock.
    pub async fn lock_event(&self, key: EventKey) -> EventGuard<'_> {
        let lock = self.event_locks.entry(key.clone()).or_default().clone();
        let guard = lock.lock_owned().await;
        EventGuard {
            manager: self,
            key,
            guard: Some(guard),
        }
    }

    fn prune_lock(&self, key: &EventKey) {
        self.event_locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Get the number of open sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
