//! Per-admin conversation state.
//!
//! Sessions live in memory and are mirrored to `bot_sessions` on every save,
//! so a restart resumes where the admin left off. A session idle for longer
//! than the TTL starts over from `Idle`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::db::Store;
use crate::models::BotSession;

/// Expired entries are swept at most this often.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

pub struct SessionManager {
    store: Store,
    sessions: RwLock<HashMap<i64, BotSession>>,
    ttl: chrono::Duration,
    cleanup_interval: Duration,
    last_cleanup: Mutex<Instant>,
}

impl SessionManager {
    #[must_use]
    pub fn new(store: Store, ttl_seconds: u64) -> Self {
        Self::with_cleanup_interval(store, ttl_seconds, CLEANUP_INTERVAL)
    }

    #[must_use]
    pub fn with_cleanup_interval(store: Store, ttl_seconds: u64, cleanup_interval: Duration) -> Self {
        Self {
            store,
            sessions: RwLock::new(HashMap::new()),
            ttl: chrono::Duration::seconds(i64::try_from(ttl_seconds).unwrap_or(i64::MAX / 1000)),
            cleanup_interval,
            last_cleanup: Mutex::new(Instant::now()),
        }
    }

    fn is_expired(&self, session: &BotSession) -> bool {
        Utc::now() - session.last_activity > self.ttl
    }

    /// Current session for `admin_id`, loaded from the store on a cache miss.
    pub async fn get(&self, admin_id: i64) -> Result<BotSession> {
        self.cleanup_expired().await;

        if let Some(session) = self.sessions.read().await.get(&admin_id)
            && !self.is_expired(session)
        {
            return Ok(session.clone());
        }

        let session = match self.store.get_bot_session(admin_id).await? {
            Some(stored) if !self.is_expired(&stored) => stored,
            Some(_) => {
                debug!(admin_id, "Bot session expired, starting over");
                BotSession::new(admin_id)
            }
            None => BotSession::new(admin_id),
        };

        self.sessions
            .write()
            .await
            .insert(admin_id, session.clone());
        Ok(session)
    }

    /// Stamps activity and persists.
    pub async fn save(&self, mut session: BotSession) -> Result<BotSession> {
        session.last_activity = Utc::now();
        self.store.save_bot_session(&session).await?;
        self.sessions
            .write()
            .await
            .insert(session.admin_id, session.clone());
        Ok(session)
    }

    /// Drops everything for `admin_id` and returns a fresh idle session.
    pub async fn reset(&self, admin_id: i64) -> Result<BotSession> {
        self.sessions.write().await.remove(&admin_id);
        self.store.clear_bot_session(admin_id).await?;
        self.save(BotSession::new(admin_id)).await
    }

    /// Removes expired in-memory sessions, at most once per cleanup interval.
    /// Returns how many were dropped.
    pub async fn cleanup_expired(&self) -> usize {
        {
            let mut last = self.last_cleanup.lock().await;
            if last.elapsed() < self.cleanup_interval {
                return 0;
            }
            *last = Instant::now();
        }

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !self.is_expired(session));
        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, "Expired bot sessions cleaned up");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BotState;

    async fn manager(ttl: u64, interval: Duration) -> SessionManager {
        let store = Store::new("sqlite::memory:").await.unwrap();
        SessionManager::with_cleanup_interval(store, ttl, interval)
    }

    #[tokio::test]
    async fn new_admin_starts_idle() {
        let sessions = manager(3600, CLEANUP_INTERVAL).await;
        let session = sessions.get(7).await.unwrap();
        assert_eq!(session.admin_id, 7);
        assert_eq!(session.state, BotState::Idle);
        assert_eq!(sessions.len().await, 1);
    }

    #[tokio::test]
    async fn save_survives_cache_loss() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let first = SessionManager::new(store.clone(), 3600);

        let mut session = first.get(7).await.unwrap();
        session.state = BotState::WaitingVideo;
        session.select(3, Some(4));
        first.save(session).await.unwrap();

        let second = SessionManager::new(store, 3600);
        let restored = second.get(7).await.unwrap();
        assert_eq!(restored.state, BotState::WaitingVideo);
        assert_eq!(restored.current_show_id, Some(3));
        assert_eq!(restored.current_season_id, Some(4));
    }

    #[tokio::test]
    async fn expired_session_starts_over() {
        let sessions = manager(60, CLEANUP_INTERVAL).await;
        let mut session = sessions.get(7).await.unwrap();
        session.state = BotState::WaitingVideo;
        sessions.save(session).await.unwrap();

        {
            let mut map = sessions.sessions.write().await;
            let entry = map.get_mut(&7).unwrap();
            entry.last_activity = Utc::now() - chrono::Duration::seconds(120);
            sessions.store.save_bot_session(entry).await.unwrap();
        }

        let session = sessions.get(7).await.unwrap();
        assert_eq!(session.state, BotState::Idle);
    }

    #[tokio::test]
    async fn reset_clears_selection() {
        let sessions = manager(3600, CLEANUP_INTERVAL).await;
        let mut session = sessions.get(7).await.unwrap();
        session.select(3, None);
        sessions.save(session).await.unwrap();

        let session = sessions.reset(7).await.unwrap();
        assert_eq!(session.current_show_id, None);
        assert_eq!(sessions.get(7).await.unwrap().current_show_id, None);
    }

    #[tokio::test]
    async fn cleanup_is_throttled() {
        let sessions = manager(60, Duration::from_secs(3600)).await;
        sessions.get(1).await.unwrap();
        sessions
            .sessions
            .write()
            .await
            .get_mut(&1)
            .unwrap()
            .last_activity = Utc::now() - chrono::Duration::seconds(120);
        assert_eq!(sessions.cleanup_expired().await, 0);
        assert_eq!(sessions.len().await, 1);

        let eager = manager(60, Duration::ZERO).await;
        eager.get(1).await.unwrap();
        eager
            .sessions
            .write()
            .await
            .get_mut(&1)
            .unwrap()
            .last_activity = Utc::now() - chrono::Duration::seconds(120);
        assert_eq!(eager.cleanup_expired().await, 1);
        assert!(eager.is_empty().await);
    }
}
