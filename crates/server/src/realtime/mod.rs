//! Realtime Hub
//!
//! Process-local rooms keyed by blog id, fanning new-comment events out to
//! live WebSocket connections. The hub never writes comments; it only
//! announces them after the content store has persisted them.
//!
//! The hub is an explicitly constructed instance carried in `AppState` and
//! handed to whoever needs to publish. Room membership is a plain relation
//! (room id -> connection ids) plus a reverse index so disconnect cleanup
//! does not scan every room.

pub mod ws;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};
use uuid::Uuid;

pub type ConnectionId = Uuid;

/// Payload broadcast when a comment is persisted. Exists only on the wire;
/// field names match the subscription contract (camelCase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentEvent {
    pub blog_id: String,
    pub comment_id: String,
    pub author_name: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Server-to-client frames on the subscription socket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    UpdateComments(CommentEvent),
}

#[derive(Default)]
struct HubState {
    connections: HashMap<ConnectionId, UnboundedSender<ServerMessage>>,
    rooms: HashMap<String, HashSet<ConnectionId>>,
    joined: HashMap<ConnectionId, HashSet<String>>,
}

pub struct RealtimeHub {
    state: RwLock<HubState>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HubState::default()),
        }
    }

    /// Register a live connection and the channel events are delivered on.
    pub fn connect(&self, conn_id: ConnectionId, sender: UnboundedSender<ServerMessage>) {
        let mut state = self.state.write();
        state.connections.insert(conn_id, sender);
        debug!("[Hub] connection {} registered", conn_id);
    }

    /// Add a connection to the room for `blog_id`. Idempotent; joining
    /// twice has the same effect as joining once. No membership limit.
    pub fn join(&self, conn_id: ConnectionId, blog_id: &str) {
        let mut state = self.state.write();
        if !state.connections.contains_key(&conn_id) {
            warn!("[Hub] join from unknown connection {}", conn_id);
            return;
        }
        state
            .rooms
            .entry(blog_id.to_string())
            .or_default()
            .insert(conn_id);
        state
            .joined
            .entry(conn_id)
            .or_default()
            .insert(blog_id.to_string());
        debug!("[Hub] connection {} joined room {}", conn_id, blog_id);
    }

    /// Remove a connection from every room it joined and forget it.
    /// Runs on every socket-termination path; rooms left empty are dropped
    /// from the table so membership entries never leak.
    pub fn leave(&self, conn_id: ConnectionId) {
        let mut state = self.state.write();
        if let Some(rooms) = state.joined.remove(&conn_id) {
            for blog_id in rooms {
                let emptied = match state.rooms.get_mut(&blog_id) {
                    Some(members) => {
                        members.remove(&conn_id);
                        members.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    state.rooms.remove(&blog_id);
                }
            }
        }
        state.connections.remove(&conn_id);
        debug!("[Hub] connection {} left", conn_id);
    }

    /// Deliver `event` to every current member of the room, the event's
    /// originator included if its own connection is subscribed. A failed
    /// send (receiver already gone) is skipped; it never aborts delivery to
    /// the rest and never surfaces to the publisher.
    ///
    /// Sends happen synchronously under the lock into per-connection FIFO
    /// channels, so within one room delivery order matches publish order.
    pub fn publish(&self, blog_id: &str, event: CommentEvent) {
        let state = self.state.read();
        let Some(members) = state.rooms.get(blog_id) else {
            debug!("[Hub] publish to empty room {}", blog_id);
            return;
        };

        let message = ServerMessage::UpdateComments(event);
        let mut delivered = 0usize;
        for conn_id in members {
            match state.connections.get(conn_id) {
                Some(sender) => {
                    if sender.send(message.clone()).is_err() {
                        debug!("[Hub] skipping closed connection {}", conn_id);
                    } else {
                        delivered += 1;
                    }
                }
                None => debug!("[Hub] member {} has no live connection", conn_id),
            }
        }
        debug!(
            "[Hub] delivered event for blog {} to {} member(s)",
            blog_id, delivered
        );
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}
