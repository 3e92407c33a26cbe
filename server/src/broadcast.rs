//! Outbound fan-out to connected clients.
//!
//! Each live connection has a writer task draining an unbounded channel, so
//! queuing a frame never waits on the socket. A failed send only means the
//! writer is gone; the matching disconnect arrives as its own event.

use log::{debug, error};
use shared::{ConnectionId, ServerMessage};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Sending half of a connection's outbound queue
pub type Outbound = mpsc::UnboundedSender<Message>;

/// Registry of outbound queues for every live connection
///
/// Includes connections that were turned away at admission; they hold no
/// player but still see state updates.
#[derive(Debug, Default)]
pub struct Broadcaster {
    connections: HashMap<ConnectionId, Outbound>,
}

impl Broadcaster {
    /// Creates a broadcaster with no connections
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
        }
    }

    /// Registers the outbound queue of a newly opened connection
    ///
    /// The connection receives every broadcast from now on, whether or not
    /// it is admitted as a player.
    pub fn register(&mut self, connection_id: ConnectionId, sender: Outbound) {
        self.connections.insert(connection_id, sender);
    }

    /// Returns false if the connection was not registered
    pub fn unregister(&mut self, connection_id: ConnectionId) -> bool {
        self.connections.remove(&connection_id).is_some()
    }

    /// Queues a message for a single connection
    pub fn send_to(&self, connection_id: ConnectionId, message: &ServerMessage) {
        let Some(sender) = self.connections.get(&connection_id) else {
            debug!("No outbound queue for connection {}", connection_id);
            return;
        };

        match message.to_json() {
            Ok(text) => {
                if sender.send(Message::Text(text)).is_err() {
                    debug!("Connection {} is no longer receiving", connection_id);
                }
            }
            Err(e) => error!("Failed to serialize message: {}", e),
        }
    }

    /// Queues a message for every registered connection
    ///
    /// The message is serialized once and the same frame is cloned into
    /// each queue.
    pub fn broadcast(&self, message: &ServerMessage) {
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to serialize broadcast: {}", e);
                return;
            }
        };

        for (connection_id, sender) in &self.connections {
            if sender.send(Message::Text(text.clone())).is_err() {
                debug!("Connection {} is no longer receiving", connection_id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
