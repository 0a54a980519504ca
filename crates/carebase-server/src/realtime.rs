//! Real-time channel over WebSocket.
//!
//! Clients send tagged JSON envelopes (`{"type": "OPTIMIZE_TOUR", ...}`).
//! Replies go to the sender only; notifications go through the [`Hub`] to
//! every other connection. Delivery is best-effort: a client that falls too
//! far behind loses the oldest notifications.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use carebase_core::models::{DocumentationPatch, DocumentationStatus, Tour};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::ai;
use crate::state::AppState;

const HUB_CAPACITY: usize = 256;

/// Messages a client may send.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    OptimizeTour {
        tour_id: String,
    },
    VoiceTranscription {
        text: String,
        #[serde(default)]
        documentation_id: Option<String>,
    },
    TourUpdate {
        tour_id: String,
    },
    DocStatusUpdate {
        documentation_id: String,
        status: DocumentationStatus,
    },
}

/// Messages the server sends.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    OptimizedTour {
        tour: Tour,
        applied: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    TranscriptionProgress {
        stage: String,
    },
    TranscriptionComplete {
        text: String,
    },
    TranscriptionError {
        message: String,
        original_text: String,
    },
    TourUpdated {
        tour_id: String,
    },
    DocStatusUpdated {
        documentation_id: String,
        status: DocumentationStatus,
    },
    Error {
        message: String,
    },
}

/// A notification and the connection it came from, if any.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub origin: Option<u64>,
    pub message: ServerMessage,
}

/// Fan-out of notifications to every connected client.
#[derive(Clone)]
pub struct Hub {
    tx: broadcast::Sender<Envelope>,
    next_id: Arc<AtomicU64>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(HUB_CAPACITY)
    }
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Register a connection: its id and its notification stream.
    pub fn connect(&self) -> (u64, broadcast::Receiver<Envelope>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        (id, self.tx.subscribe())
    }

    /// Notify every connection except `origin`.
    pub fn publish(&self, origin: Option<u64>, message: ServerMessage) {
        match self.tx.send(Envelope { origin, message }) {
            Ok(receivers) => debug!(receivers, "published notification"),
            Err(_) => debug!("no clients connected; notification dropped"),
        }
    }

    pub fn tours_updated<'a>(&self, origin: Option<u64>, tour_ids: impl IntoIterator<Item = &'a String>) {
        for tour_id in tour_ids {
            self.publish(
                origin,
                ServerMessage::TourUpdated {
                    tour_id: tour_id.clone(),
                },
            );
        }
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| connection(socket, state))
}

async fn connection(socket: WebSocket, state: AppState) {
    let (id, mut notifications) = state.hub.connect();
    let (mut sink, mut stream) = socket.split();
    let (reply_tx, mut replies) = mpsc::unbounded_channel::<ServerMessage>();
    info!(connection = id, "websocket connected");

    loop {
        let outgoing = tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let state = state.clone();
                    let reply_tx = reply_tx.clone();
                    tokio::spawn(async move { handle_text(&state, id, &text, &reply_tx).await });
                    continue;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!(connection = id, error = %e, "websocket receive failed");
                    break;
                }
            },
            Some(reply) = replies.recv() => reply,
            notification = notifications.recv() => match notification {
                Ok(envelope) if envelope.origin == Some(id) => continue,
                Ok(envelope) => envelope.message,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(connection = id, skipped, "websocket client lagging; notifications dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };

        let text = match serde_json::to_string(&outgoing) {
            Ok(text) => text,
            Err(e) => {
                warn!(connection = id, error = %e, "could not encode websocket message");
                continue;
            }
        };
        if sink.send(Message::Text(text)).await.is_err() {
            break;
        }
    }

    info!(connection = id, "websocket disconnected");
}

fn reply(to: &mpsc::UnboundedSender<ServerMessage>, message: ServerMessage) {
    // The connection may already be gone.
    let _ = to.send(message);
}

/// Handle one text frame from connection `origin`. Replies for the sender
/// are pushed to `replies` in order; notifications for other clients go
/// through the hub.
pub async fn handle_text(
    state: &AppState,
    origin: u64,
    text: &str,
    replies: &mpsc::UnboundedSender<ServerMessage>,
) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            debug!(connection = origin, error = %e, "malformed websocket message");
            reply(
                replies,
                ServerMessage::Error {
                    message: format!("invalid message: {}", e),
                },
            );
            return;
        }
    };

    match message {
        ClientMessage::OptimizeTour { tour_id } => match ai::optimize_tour(state, &tour_id).await {
            Ok(outcome) => {
                if outcome.applied {
                    state.hub.tours_updated(
                        Some(origin),
                        std::iter::once(&outcome.tour.id).chain(&outcome.shifted_tour_ids),
                    );
                }
                reply(
                    replies,
                    ServerMessage::OptimizedTour {
                        tour: outcome.tour,
                        applied: outcome.applied,
                        message: outcome.message,
                    },
                );
            }
            Err(e) => reply(replies, ServerMessage::Error { message: e.to_string() }),
        },

        ClientMessage::VoiceTranscription {
            text,
            documentation_id,
        } => transcribe(state, text, documentation_id, replies).await,

        ClientMessage::TourUpdate { tour_id } => {
            let id = tour_id.clone();
            match state.run(move |core| core.get_tour(&id)).await {
                Ok(_) => state.hub.publish(Some(origin), ServerMessage::TourUpdated { tour_id }),
                Err(e) => reply(replies, ServerMessage::Error { message: e.to_string() }),
            }
        }

        ClientMessage::DocStatusUpdate {
            documentation_id,
            status,
        } => {
            let id = documentation_id.clone();
            match state
                .run(move |core| core.set_documentation_status(&id, status))
                .await
            {
                Ok(doc) => {
                    let update = ServerMessage::DocStatusUpdated {
                        documentation_id: doc.id,
                        status: doc.status,
                    };
                    state.hub.publish(Some(origin), update.clone());
                    reply(replies, update);
                }
                Err(e) => reply(replies, ServerMessage::Error { message: e.to_string() }),
            }
        }
    }
}

async fn transcribe(
    state: &AppState,
    text: String,
    documentation_id: Option<String>,
    replies: &mpsc::UnboundedSender<ServerMessage>,
) {
    if text.trim().is_empty() {
        reply(
            replies,
            ServerMessage::TranscriptionError {
                message: "transcription is empty".into(),
                original_text: text,
            },
        );
        return;
    }

    reply(replies, ServerMessage::TranscriptionProgress { stage: "cleaning".into() });
    let cleaned = match state.assistant.clean_transcription(&text).await {
        Ok(cleaned) => cleaned,
        Err(e) => {
            warn!(error = %e, "transcription cleanup unavailable");
            reply(
                replies,
                ServerMessage::TranscriptionError {
                    message: format!("could not clean up the transcription: {}", e),
                    original_text: text,
                },
            );
            return;
        }
    };

    if let Some(doc_id) = documentation_id {
        reply(replies, ServerMessage::TranscriptionProgress { stage: "saving".into() });
        let addition = cleaned.clone();
        let saved = state
            .run(move |core| {
                let doc = core.get_documentation(&doc_id)?;
                let content = if doc.content.trim().is_empty() {
                    addition
                } else {
                    format!("{}\n{}", doc.content, addition)
                };
                core.update_documentation(
                    &doc_id,
                    DocumentationPatch {
                        content: Some(content),
                        ..Default::default()
                    },
                )
            })
            .await;
        if let Err(e) = saved {
            reply(
                replies,
                ServerMessage::TranscriptionError {
                    message: format!("could not save the transcription: {}", e),
                    original_text: text,
                },
            );
            return;
        }
    }

    reply(replies, ServerMessage::TranscriptionComplete { text: cleaned });
}
