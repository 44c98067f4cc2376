//! Subscription socket
//!
//! `GET /ws` upgrades to a WebSocket. Clients send `joinBlog` frames to
//! subscribe to a blog's comment room; the server pushes `updateComments`
//! frames whenever a comment is persisted for a subscribed blog. A single
//! connection may join any number of rooms.

use crate::core::config::AppState;
use crate::realtime::RealtimeHub;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Client-to-server frames.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    JoinBlog {
        #[serde(rename = "blogId")]
        blog_id: String,
    },
}

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub.clone()))
}

async fn handle_socket(socket: WebSocket, hub: Arc<RealtimeHub>) {
    let conn_id = Uuid::new_v4();
    info!("[Realtime] connection {} opened", conn_id);

    let (tx, mut rx) = mpsc::unbounded_channel();
    hub.connect(conn_id, tx);

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            maybe_event = rx.recv() => {
                // Hub dropped our sender (connection already left)
                let Some(event) = maybe_event else { break };
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("[Realtime] failed to encode event for {}: {}", conn_id, e);
                        continue;
                    }
                };
                if sink.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::JoinBlog { blog_id }) => {
                                hub.join(conn_id, &blog_id);
                            }
                            Err(e) => {
                                // Unknown frames are ignored, not fatal
                                debug!("[Realtime] malformed frame from {}: {}", conn_id, e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Ping/pong handled by axum; binary frames ignored
                    }
                    Some(Err(e)) => {
                        debug!("[Realtime] socket error on {}: {}", conn_id, e);
                        break;
                    }
                }
            }
        }
    }

    // Best-effort cleanup on every termination path, normal or abnormal.
    hub.leave(conn_id);
    info!("[Realtime] connection {} closed", conn_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_blog_frame_parses() {
        let frame = r#"{"type":"joinBlog","blogId":"blog-7"}"#;
        let ClientMessage::JoinBlog { blog_id } = serde_json::from_str(frame).unwrap();
        assert_eq!(blog_id, "blog-7");
    }

    #[test]
    fn unknown_frame_type_is_an_error() {
        let frame = r#"{"type":"newComment","blogId":"blog-7"}"#;
        assert!(serde_json::from_str::<ClientMessage>(frame).is_err());
    }
}
