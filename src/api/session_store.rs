//! In-memory conversation store (non-persistent).
//!
//! The browser session cookie and its inactivity expiry are handled by
//! `tower-sessions`; the session only records which conversation it owns.
//! Each conversation sits behind its own mutex, so a turn has exclusive
//! access to its session while other sessions proceed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::conversation::ConversationState;

/// State of one browser session.
#[derive(Debug)]
pub struct ChatSession {
    pub id: Uuid,
    pub conversation: ConversationState,
    /// Error from the last failed submission, shown until the next success
    pub notice: Option<String>,
    last_active: Instant,
}

impl ChatSession {
    fn new(id: Uuid) -> Self {
        Self {
            id,
            conversation: ConversationState::new(),
            notice: None,
            last_active: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }
}

pub type SessionHandle = Arc<Mutex<ChatSession>>;

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Look up `id`, or start a new session when it is absent or unknown.
    /// The returned flag is true for a newly created session.
    pub async fn get_or_create(&self, id: Option<Uuid>) -> (SessionHandle, bool) {
        if let Some(existing) = match id {
            Some(id) => self.get(id).await,
            None => None,
        } {
            return (existing, false);
        }

        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(ChatSession::new(id)));
        self.sessions.write().await.insert(id, Arc::clone(&session));
        tracing::debug!(session_id = %id, "Created chat session");
        (session, true)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle for longer than `max_idle`. Sessions in the middle of
    /// a turn are locked and therefore kept.
    pub async fn prune_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => session.idle_for() <= max_idle,
            Err(_) => true,
        });
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::info!(pruned, remaining = sessions.len(), "Pruned idle chat sessions");
        }
        pruned
    }
}

/// Periodically drop conversations whose browser session has gone idle.
pub async fn run_idle_cleanup(sessions: SessionStore, period: Duration, max_idle: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // first tick is immediate; skip it
    loop {
        interval.tick().await;
        sessions.prune_idle(max_idle).await;
    }
}
