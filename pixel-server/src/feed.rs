//! WebSocket change feed.
//!
//! On connect the client receives the current document (when one exists) as a
//! `snapshot` frame, then one `snapshot` per accepted write. `ping` frames are
//! answered with `pong`; anything else gets an `error` frame.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use pixel_core::FeedMessage;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::hub::DocumentHub;
use crate::metrics;
use crate::validation::validate_message_size;

/// Serialize and send one feed frame. Returns `false` once the peer is gone.
async fn send_frame<S>(sender: &mut S, message: &FeedMessage) -> bool
where
    S: SinkExt<Message> + Unpin,
{
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize feed frame: {e}");
            return true;
        }
    };
    if sender.send(Message::Text(json.into())).await.is_err() {
        return false;
    }
    metrics::record_ws_message("outbound", frame_type(message));
    true
}

const fn frame_type(message: &FeedMessage) -> &'static str {
    match message {
        FeedMessage::Snapshot { .. } => "snapshot",
        FeedMessage::Ping => "ping",
        FeedMessage::Pong => "pong",
        FeedMessage::Error { .. } => "error",
    }
}

/// Reply to an inbound text frame, if it warrants one.
fn reply_to(text: &str) -> Option<FeedMessage> {
    if let Err(e) = validate_message_size(text) {
        metrics::record_validation_failure(e.kind());
        return Some(FeedMessage::Error {
            message: e.to_string(),
        });
    }
    match serde_json::from_str::<FeedMessage>(text) {
        Ok(FeedMessage::Ping) => {
            metrics::record_ws_message("inbound", "ping");
            Some(FeedMessage::Pong)
        }
        Ok(FeedMessage::Pong) => {
            metrics::record_ws_message("inbound", "pong");
            None
        }
        Ok(other) => {
            metrics::record_ws_message("inbound", frame_type(&other));
            Some(FeedMessage::Error {
                message: "feed is read-only; write with PUT /api/canvas".to_string(),
            })
        }
        Err(e) => {
            metrics::record_ws_message("inbound", "invalid");
            Some(FeedMessage::Error {
                message: format!("invalid message: {e}"),
            })
        }
    }
}

/// Drive one feed connection until either side closes.
pub async fn handle_feed_socket(socket: WebSocket, hub: DocumentHub) {
    let peer_id = Uuid::new_v4().to_string();
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before reading the current document so no write falls in between.
    let mut updates = hub.subscribe();
    metrics::inc_ws_connections();
    tracing::info!(peer_id = %peer_id, feeds = hub.subscriber_count(), "Feed connected");

    let mut open = match hub.current() {
        Some(document) => send_frame(&mut sender, &FeedMessage::Snapshot { document }).await,
        None => true,
    };

    while open {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(document) => {
                    open = send_frame(&mut sender, &FeedMessage::Snapshot { document }).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Only the latest state matters.
                    tracing::warn!(peer_id = %peer_id, skipped, "Feed lagged, resending current document");
                    if let Some(document) = hub.current() {
                        open = send_frame(&mut sender, &FeedMessage::Snapshot { document }).await;
                    }
                }
                Err(RecvError::Closed) => open = false,
            },
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = reply_to(text.as_str()) {
                        open = send_frame(&mut sender, &reply).await;
                    }
                }
                Some(Ok(Message::Close(_))) | None => open = false,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(peer_id = %peer_id, "Feed receive error: {e}");
                    open = false;
                }
            },
        }
    }

    metrics::dec_ws_connections();
    tracing::info!(peer_id = %peer_id, "Feed disconnected");
}
