//! In-memory session store
//!
//! Tracks per-conversation message history with a fixed-lease lifecycle:
//! every session expires exactly TTL after creation, regardless of
//! activity. This is deliberate (matching the service's ephemeral-session
//! policy), not a sliding window; `last_activity` is recorded for
//! observability only and never extends the lease.
//!
//! Write operations on unknown ids fail with `SessionNotFound`; read
//! operations are lenient and return empty results.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::errors::{AppError, Result};

/// Buffered expiry notifications per subscriber
const EXPIRATION_BUFFER: usize = 64;

/// One exchanged user/bot message pair.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ChatMessage {
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub bot: String,
}

/// A logical conversation with ordered, append-only history.
#[derive(Clone, Debug)]
pub struct Session {
    pub id: Uuid,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Concurrent session store. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    ttl: Duration,
    expirations: broadcast::Sender<Uuid>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        let (expirations, _) = broadcast::channel(EXPIRATION_BUFFER);
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            expirations,
        }
    }

    /// Subscribe to expiry notifications. Each expired session id is sent
    /// once, after removal, so holders of per-session resources can release
    /// them. Sends are best-effort; a subscriber that falls behind sees
    /// `Lagged` and must resynchronize against the store itself.
    pub fn expirations(&self) -> broadcast::Receiver<Uuid> {
        self.expirations.subscribe()
    }

    /// Create a session and schedule its one unconditional expiry at
    /// `created_at + TTL`. Expiry removes the session and its history
    /// outright.
    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let session = Session {
            id,
            messages: Vec::new(),
            created_at: now,
            last_activity: now,
        };
        self.sessions.write().await.insert(id, session);

        let store = self.clone();
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if store.sessions.write().await.remove(&id).is_some() {
                let _ = store.expirations.send(id);
                tracing::debug!(session_id = %id, "session expired");
            }
        });

        metrics::counter!("newsdesk_sessions_created_total").increment(1);
        tracing::info!(session_id = %id, "session created");
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<Session> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Append an exchange to a session's history. Strict: unknown ids fail.
    pub async fn append_message(&self, id: Uuid, user: &str, bot: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or(AppError::SessionNotFound { id })?;

        let now = Utc::now();
        session.messages.push(ChatMessage {
            timestamp: now,
            user: user.to_string(),
            bot: bot.to_string(),
        });
        session.last_activity = now;
        Ok(())
    }

    /// Ordered message history. Lenient: unknown ids read as empty.
    pub async fn history(&self, id: Uuid) -> Vec<ChatMessage> {
        self.sessions
            .read()
            .await
            .get(&id)
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    /// Reset a session's history, keeping its identity and creation time.
    /// No-op on unknown ids.
    pub async fn clear(&self, id: Uuid) {
        if let Some(session) = self.sessions.write().await.get_mut(&id) {
            session.messages.clear();
            tracing::info!(session_id = %id, "session reset");
        }
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
