//! Server network layer handling WebSocket connections and the event loop

use crate::dispatch::{Dispatcher, NetworkEvent};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientMessage, ConnectionId};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Interval between keep-alive pings on idle connections
const PING_INTERVAL: Duration = Duration::from_secs(20);

/// Main server owning the listener and the only session
pub struct Server {
    listener: TcpListener,
    dispatcher: Dispatcher,
    next_connection_id: ConnectionId,

    // Connection tasks report to the event loop through this channel
    event_tx: mpsc::UnboundedSender<NetworkEvent>,
    event_rx: mpsc::UnboundedReceiver<NetworkEvent>,
}

impl Server {
    /// Binds the listener with a fresh session behind it
    ///
    /// Pass port 0 to bind an ephemeral port; [`Server::local_addr`] reports
    /// the one picked.
    pub async fn new(addr: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::with_dispatcher(addr, Dispatcher::new()).await
    }

    /// Binds the listener in front of an existing dispatcher
    ///
    /// Used to run the transport over a session with a custom catalog or a
    /// deterministic random source.
    pub async fn with_dispatcher(
        addr: &str,
        dispatcher: Dispatcher,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            dispatcher,
            next_connection_id: 1,
            event_tx,
            event_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Spawns the task that owns one client connection
    fn spawn_connection(&mut self, stream: TcpStream, addr: SocketAddr) {
        let connection_id = self.next_connection_id;
        self.next_connection_id += 1;

        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, connection_id, event_tx).await {
                warn!("Connection {} from {} failed: {}", connection_id, addr, e);
            }
        });
    }

    /// Main server loop: accepts connections and applies their events in order
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!("Server started successfully");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            debug!("Accepted TCP connection from {}", addr);
                            self.spawn_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Error accepting connection: {}", e);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    }
                },

                // The server holds a sender itself, so the channel never closes
                Some(event) = self.event_rx.recv() => {
                    self.dispatcher.handle_event(event);
                },
            }
        }
    }
}

/// Performs the handshake, then pumps frames in both directions
///
/// The reader runs on this task and turns frames into events; a spawned
/// writer drains the outbound queue and keeps the socket alive with pings.
/// Whatever ends the connection, a `Disconnected` event is sent once a
/// `Connected` event went out.
async fn handle_connection(
    stream: TcpStream,
    connection_id: ConnectionId,
    event_tx: mpsc::UnboundedSender<NetworkEvent>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();

    let (sender, mut outbound) = mpsc::unbounded_channel::<Message>();
    event_tx.send(NetworkEvent::Connected {
        connection_id,
        sender,
    })?;

    let writer = tokio::spawn(async move {
        let mut ping = tokio::time::interval(PING_INTERVAL);
        // Skip the first tick since it fires immediately
        ping.tick().await;

        loop {
            tokio::select! {
                message = outbound.recv() => {
                    let Some(message) = message else { break };
                    if let Err(e) = write.send(message).await {
                        debug!("Failed to write to connection {}: {}", connection_id, e);
                        break;
                    }
                },
                _ = ping.tick() => {
                    if write.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                },
            }
        }
    });

    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => match ClientMessage::from_json(&text) {
                Ok(message) => {
                    if event_tx
                        .send(NetworkEvent::MessageReceived {
                            connection_id,
                            message,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => warn!(
                    "Dropping malformed message from connection {}: {}",
                    connection_id, e
                ),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Read error on connection {}: {}", connection_id, e);
                break;
            }
        }
    }

    writer.abort();
    event_tx.send(NetworkEvent::Disconnected { connection_id })?;

    Ok(())
}
