//! Real-time session channel boundary
//!
//! A transport-free message-passing interface: client events arrive on an
//! mpsc channel, each tagged with a reply handle; answers for a session are
//! broadcast to every subscriber of that session. Transports (websocket,
//! console, tests) only need to produce [`ChatRequest`]s and consume
//! [`ServerEvent`]s.
//!
//! Messages sent to one session are answered in submission order: each
//! session gets a FIFO worker queue, so generation calls for different
//! sessions overlap while one session's history never interleaves.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use uuid::Uuid;

use crate::services::AppState;
use crate::sessions::ChatMessage;

/// Depth of each per-session work queue
const SESSION_QUEUE_DEPTH: usize = 32;

/// Broadcast buffer per session
const SUBSCRIBER_BUFFER: usize = 64;

/// Error message surfaced for any failed event
const PROCESSING_FAILED: &str = "Failed to process your message. Please try again.";

/// Events a client can send into the gateway.
#[derive(Clone, Debug)]
pub enum ClientEvent {
    CreateSession,
    JoinSession { session_id: Uuid },
    SendMessage { session_id: Uuid, message: String },
    ResetSession { session_id: Uuid },
}

/// Events emitted back to clients.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum ServerEvent {
    SessionCreated {
        session_id: Uuid,
    },
    SessionHistory {
        messages: Vec<ChatMessage>,
    },
    BotResponse {
        user_message: String,
        bot_response: String,
        timestamp: DateTime<Utc>,
    },
    SessionReset,
    Error {
        message: String,
    },
}

/// One inbound event plus the handle direct replies go to.
pub struct ChatRequest {
    pub event: ClientEvent,
    pub reply: mpsc::Sender<ServerEvent>,
}

type QueryJob = (String, mpsc::Sender<ServerEvent>);

/// Dispatches client events onto the session store and RAG engine.
pub struct ChatGateway {
    state: AppState,
    subscribers: RwLock<HashMap<Uuid, broadcast::Sender<ServerEvent>>>,
    workers: Mutex<HashMap<Uuid, mpsc::Sender<QueryJob>>>,
}

impl ChatGateway {
    pub fn new(state: AppState) -> Arc<Self> {
        let mut expirations = state.sessions.expirations();
        let gateway = Arc::new(Self {
            state,
            subscribers: RwLock::new(HashMap::new()),
            workers: Mutex::new(HashMap::new()),
        });

        // release a session's channels once the store drops the session
        let handle = Arc::downgrade(&gateway);
        tokio::spawn(async move {
            loop {
                let notice = expirations.recv().await;
                let gateway = match handle.upgrade() {
                    Some(gateway) => gateway,
                    None => break,
                };
                match notice {
                    Ok(session_id) => gateway.evict(session_id).await,
                    Err(broadcast::error::RecvError::Lagged(_)) => gateway.prune().await,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        gateway
    }

    /// Consume client events until the channel closes. Dispatch is inline
    /// and cheap: queries only get enqueued here and run on per-session
    /// worker tasks, so a slow generation call never blocks the stream and
    /// events keep their arrival order.
    pub async fn run(self: Arc<Self>, mut requests: mpsc::Receiver<ChatRequest>) {
        while let Some(request) = requests.recv().await {
            self.clone().handle(request).await;
        }
    }

    async fn handle(self: Arc<Self>, request: ChatRequest) {
        let ChatRequest { event, reply } = request;
        match event {
            ClientEvent::CreateSession => {
                let session_id = self.state.sessions.create().await;
                let _ = reply.send(ServerEvent::SessionCreated { session_id }).await;
            }
            ClientEvent::JoinSession { session_id } => {
                let mut events = self.subscribe(session_id).await;
                let subscriber = reply.clone();
                tokio::spawn(async move {
                    while let Ok(event) = events.recv().await {
                        if subscriber.send(event).await.is_err() {
                            break;
                        }
                    }
                });

                let messages = self.state.sessions.history(session_id).await;
                tracing::info!(session_id = %session_id, "client joined session");
                let _ = reply.send(ServerEvent::SessionHistory { messages }).await;
            }
            ClientEvent::SendMessage { session_id, message } => {
                // unknown ids get an error without leaving a worker behind
                if self.state.sessions.get(session_id).await.is_none() {
                    let _ = reply
                        .send(ServerEvent::Error {
                            message: PROCESSING_FAILED.to_string(),
                        })
                        .await;
                    return;
                }
                let worker = self.clone().worker(session_id).await;
                if worker.send((message, reply.clone())).await.is_err() {
                    let _ = reply
                        .send(ServerEvent::Error {
                            message: PROCESSING_FAILED.to_string(),
                        })
                        .await;
                }
            }
            ClientEvent::ResetSession { session_id } => {
                self.state.sessions.clear(session_id).await;
                let _ = reply.send(ServerEvent::SessionReset).await;
            }
        }
    }

    /// Subscribe to a session's outbound events, creating its broadcast
    /// channel on first use.
    async fn subscribe(&self, session_id: Uuid) -> broadcast::Receiver<ServerEvent> {
        let mut subscribers = self.subscribers.write().await;
        subscribers
            .entry(session_id)
            .or_insert_with(|| broadcast::channel(SUBSCRIBER_BUFFER).0)
            .subscribe()
    }

    /// Get or spawn the FIFO worker serializing one session's queries.
    async fn worker(self: Arc<Self>, session_id: Uuid) -> mpsc::Sender<QueryJob> {
        let mut workers = self.workers.lock().await;
        if let Some(sender) = workers.get(&session_id) {
            return sender.clone();
        }

        let (sender, receiver) = mpsc::channel(SESSION_QUEUE_DEPTH);
        let gateway = self.clone();
        tokio::spawn(async move {
            gateway.worker_loop(session_id, receiver).await;
        });
        workers.insert(session_id, sender.clone());
        sender
    }

    async fn worker_loop(self: Arc<Self>, session_id: Uuid, mut jobs: mpsc::Receiver<QueryJob>) {
        while let Some((message, reply)) = jobs.recv().await {
            tracing::debug!(session_id = %session_id, "processing message");
            match self.state.engine.answer(session_id, &message).await {
                Ok(answer) => {
                    let event = ServerEvent::BotResponse {
                        user_message: message,
                        bot_response: answer,
                        timestamp: Utc::now(),
                    };
                    // fall back to a direct reply when nobody has joined yet
                    if !self.broadcast(session_id, event.clone()).await {
                        let _ = reply.send(event).await;
                    }
                }
                Err(err) => {
                    tracing::warn!(session_id = %session_id, error = %err, "message failed");
                    let _ = reply
                        .send(ServerEvent::Error {
                            message: PROCESSING_FAILED.to_string(),
                        })
                        .await;
                }
            }
        }
    }

    /// Broadcast an event to a session's subscribers. Returns false when
    /// nothing was delivered.
    async fn broadcast(&self, session_id: Uuid, event: ServerEvent) -> bool {
        let subscribers = self.subscribers.read().await;
        match subscribers.get(&session_id) {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Drop a session's broadcast channel and worker queue. Closing the
    /// queue ends the worker task; closing the channel ends any joined
    /// forwarders.
    async fn evict(&self, session_id: Uuid) {
        self.subscribers.write().await.remove(&session_id);
        if self.workers.lock().await.remove(&session_id).is_some() {
            tracing::debug!(session_id = %session_id, "session channels released");
        }
    }

    /// Resynchronize against the store after missed expiry notices,
    /// dropping every entry whose session is gone.
    async fn prune(&self) {
        let mut subscribers = self.subscribers.write().await;
        let mut workers = self.workers.lock().await;
        let mut stale = Vec::new();
        for id in subscribers.keys().chain(workers.keys()) {
            if self.state.sessions.get(*id).await.is_none() {
                stale.push(*id);
            }
        }
        for id in stale {
            subscribers.remove(&id);
            workers.remove(&id);
        }
    }

    #[cfg(test)]
    async fn worker_count(&self) -> usize {
        self.workers.lock().await.len()
    }

    #[cfg(test)]
    async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}
