// src/services/session_store.rs

use std::collections::HashMap;

use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::services::quiz_session::QuizSession;

/// Live quiz sessions, keyed by a random id and bound to the user who started them.
///
/// Sessions live only in memory: an abandoned or expired session disappears
/// without leaving anything in the attempt history.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, QuizSession>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl: i64::try_from(ttl_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
        }
    }

    fn is_expired(&self, session: &QuizSession) -> bool {
        Utc::now() - session.started_at() > self.ttl
    }

    /// Registers a new session, dropping expired ones first.
    pub async fn insert(&self, session: QuizSession) -> Uuid {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| !self.is_expired(s));
        let purged = before - sessions.len();
        if purged > 0 {
            tracing::info!("Dropped {} expired quiz sessions", purged);
        }

        let id = Uuid::new_v4();
        sessions.insert(id, session);
        id
    }

    /// Runs `f` against the session if it exists, belongs to `user_id` and has not expired.
    pub async fn with_session<R>(
        &self,
        id: Uuid,
        user_id: i64,
        f: impl FnOnce(&mut QuizSession) -> R,
    ) -> Option<R> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get(&id).filter(|s| s.user_id() == user_id)?;
        if self.is_expired(session) {
            sessions.remove(&id);
            return None;
        }
        sessions.get_mut(&id).map(f)
    }

    pub async fn remove(&self, id: Uuid) -> Option<QuizSession> {
        self.sessions.lock().await.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
