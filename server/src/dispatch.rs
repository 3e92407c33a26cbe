//! Routes transport events into the session and answers them.
//!
//! The dispatcher is owned by the server event loop and handles one event at
//! a time, which is what keeps every session operation atomic.

use crate::broadcast::{Broadcaster, Outbound};
use crate::session::Session;
use crate::turn;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::Rng;
use shared::{ClientMessage, ConnectionId, ServerMessage};

/// Events delivered from connection tasks to the event loop
#[derive(Debug)]
pub enum NetworkEvent {
    Connected {
        connection_id: ConnectionId,
        sender: Outbound,
    },
    MessageReceived {
        connection_id: ConnectionId,
        message: ClientMessage,
    },
    Disconnected {
        connection_id: ConnectionId,
    },
}

/// Applies network events to the session and fans the results out
///
/// Owns both the session and the outbound queues of every open connection,
/// players and spectators alike.
pub struct Dispatcher<R: Rng = StdRng> {
    session: Session<R>,
    outbound: Broadcaster,
}

impl Dispatcher<StdRng> {
    /// Creates a dispatcher over an empty session with the standard catalog
    pub fn new() -> Self {
        Self::with_session(Session::new())
    }
}

impl Default for Dispatcher<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> Dispatcher<R> {
    /// Creates a dispatcher over an existing session
    ///
    /// No connections are registered yet; the session's players only get
    /// updates once their connections announce themselves.
    pub fn with_session(session: Session<R>) -> Self {
        Self {
            session,
            outbound: Broadcaster::new(),
        }
    }

    pub fn session(&self) -> &Session<R> {
        &self.session
    }

    /// Handles one event from a connection task
    ///
    /// - `Connected`: admits the connection and sends `init_player` followed
    ///   by a state broadcast, or `game_full` to that connection alone
    /// - `MessageReceived`: ends the sender's turn and broadcasts, unless it
    ///   is not the sender's turn
    /// - `Disconnected`: drops the connection and broadcasts if it held a hero
    pub fn handle_event(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::Connected {
                connection_id,
                sender,
            } => self.on_connect(connection_id, sender),
            NetworkEvent::MessageReceived {
                connection_id,
                message,
            } => self.on_message(connection_id, message),
            NetworkEvent::Disconnected { connection_id } => self.on_disconnect(connection_id),
        }
    }

    fn on_connect(&mut self, connection_id: ConnectionId, sender: Outbound) {
        info!("Connection {} opened", connection_id);
        self.outbound.register(connection_id, sender);

        match self.session.admit(connection_id) {
            Ok(player) => {
                self.outbound
                    .send_to(connection_id, &ServerMessage::InitPlayer(player));
                self.broadcast_state();
            }
            Err(rejection) => {
                info!("Rejected connection {}: {}", connection_id, rejection);
                self.outbound.send_to(
                    connection_id,
                    &ServerMessage::GameFull {
                        message: rejection.to_string(),
                    },
                );
            }
        }
    }

    fn on_message(&mut self, connection_id: ConnectionId, message: ClientMessage) {
        match message {
            ClientMessage::EndTurn { updated_player } => {
                match turn::end_turn(&mut self.session, connection_id, updated_player) {
                    Ok(()) => {
                        debug!(
                            "Connection {} ended its turn, round {}",
                            connection_id,
                            self.session.round()
                        );
                        self.broadcast_state();
                    }
                    Err(violation) => debug!("Ignoring end_turn: {}", violation),
                }
            }
        }
    }

    fn on_disconnect(&mut self, connection_id: ConnectionId) {
        info!("Connection {} closed", connection_id);
        self.outbound.unregister(connection_id);

        if self.session.remove(connection_id) {
            self.broadcast_state();
        }
    }

    fn broadcast_state(&self) {
        self.outbound
            .broadcast(&ServerMessage::GameStateUpdate(self.session.snapshot()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, HERO_CATALOG};
    use pretty_assertions::assert_eq;
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use serde_json::json;
    use shared::{GameSnapshot, PlayerUpdate};
    use tokio::sync::mpsc;
    use tokio_tungstenite::tungstenite::Message;

    type Inbox = mpsc::UnboundedReceiver<Message>;

    fn dispatcher() -> Dispatcher<StdRng> {
        Dispatcher::with_session(Session::with_rng(
            Catalog::standard(),
            StdRng::seed_from_u64(99),
        ))
    }

    fn connect<R: Rng>(dispatcher: &mut Dispatcher<R>, connection_id: ConnectionId) -> Inbox {
        let (sender, inbox) = mpsc::unbounded_channel();
        dispatcher.handle_event(NetworkEvent::Connected {
            connection_id,
            sender,
        });
        inbox
    }

    fn drain(inbox: &mut Inbox) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(Message::Text(text)) = inbox.try_recv() {
            messages.push(ServerMessage::from_json(&text).unwrap());
        }
        messages
    }

    fn last_snapshot(inbox: &mut Inbox) -> GameSnapshot {
        drain(inbox)
            .into_iter()
            .rev()
            .find_map(|message| match message {
                ServerMessage::GameStateUpdate(snapshot) => Some(snapshot),
                _ => None,
            })
            .expect("no state update received")
    }

    fn end_turn(connection_id: ConnectionId, gold: i64) -> NetworkEvent {
        NetworkEvent::MessageReceived {
            connection_id,
            message: ClientMessage::EndTurn {
                updated_player: Some(PlayerUpdate {
                    gold,
                    troops: 2,
                    buildings: vec![json!("farm")],
                }),
            },
        }
    }

    #[test]
    fn test_connect_sends_init_then_state() {
        let mut dispatcher = dispatcher();
        let mut inbox = connect(&mut dispatcher, 1);

        let messages = drain(&mut inbox);

        assert_eq!(messages.len(), 2);
        let player = match &messages[0] {
            ServerMessage::InitPlayer(player) => player.clone(),
            other => panic!("Expected init_player, got {:?}", other),
        };
        assert_eq!(player.socket_id, 1);
        assert_eq!(
            messages[1],
            ServerMessage::GameStateUpdate(GameSnapshot {
                players: vec![player],
                current_turn_id: Some(1),
                round: 1,
            })
        );
    }

    #[test]
    fn test_join_is_broadcast_to_existing_players() {
        let mut dispatcher = dispatcher();
        let mut first = connect(&mut dispatcher, 1);
        drain(&mut first);

        let _second = connect(&mut dispatcher, 2);

        let messages = drain(&mut first);
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            ServerMessage::GameStateUpdate(snapshot) => assert_eq!(snapshot.players.len(), 2),
            other => panic!("Expected game_state_update, got {:?}", other),
        }
    }

    #[test]
    fn test_fifth_connection_gets_game_full() {
        let mut dispatcher = dispatcher();
        let mut inboxes: Vec<Inbox> = (1..=4).map(|id| connect(&mut dispatcher, id)).collect();
        for inbox in &mut inboxes {
            drain(inbox);
        }

        let mut fifth = connect(&mut dispatcher, 5);

        assert_eq!(
            drain(&mut fifth),
            vec![ServerMessage::GameFull {
                message: "La partida está llena (4/4)".to_string()
            }]
        );
        for inbox in &mut inboxes {
            assert!(drain(inbox).is_empty());
        }
        assert_eq!(dispatcher.session().len(), 4);
    }

    #[test]
    fn test_exhausted_catalog_gets_distinct_message() {
        let session = Session::with_rng(Catalog::new(vec![HERO_CATALOG[0]]), StepRng::new(0, 0));
        let mut dispatcher = Dispatcher::with_session(session);
        let _first = connect(&mut dispatcher, 1);

        let mut second = connect(&mut dispatcher, 2);

        assert_eq!(
            drain(&mut second),
            vec![ServerMessage::GameFull {
                message: "Error: No quedan héroes disponibles.".to_string()
            }]
        );
    }

    #[test]
    fn test_spectator_receives_later_updates() {
        let mut dispatcher = dispatcher();
        let _players: Vec<Inbox> = (1..=4).map(|id| connect(&mut dispatcher, id)).collect();
        let mut spectator = connect(&mut dispatcher, 5);
        drain(&mut spectator);

        dispatcher.handle_event(end_turn(1, 900));

        assert_eq!(last_snapshot(&mut spectator).current_turn_id, Some(2));
    }

    #[test]
    fn test_spectator_end_turn_and_disconnect_are_ignored() {
        let mut dispatcher = dispatcher();
        let mut players: Vec<Inbox> = (1..=4).map(|id| connect(&mut dispatcher, id)).collect();
        let _spectator = connect(&mut dispatcher, 5);
        for inbox in &mut players {
            drain(inbox);
        }

        dispatcher.handle_event(end_turn(5, 1));
        dispatcher.handle_event(NetworkEvent::Disconnected { connection_id: 5 });

        for inbox in &mut players {
            assert!(drain(inbox).is_empty());
        }
    }

    #[test]
    fn test_end_turn_updates_and_rotates() {
        let mut dispatcher = dispatcher();
        let mut first = connect(&mut dispatcher, 1);
        let _second = connect(&mut dispatcher, 2);
        drain(&mut first);

        dispatcher.handle_event(end_turn(1, 900));

        let snapshot = last_snapshot(&mut first);
        let player = snapshot.players.iter().find(|p| p.socket_id == 1).unwrap();
        assert_eq!(player.gold, 900);
        assert_eq!(player.troops, 2);
        assert_eq!(player.buildings, vec![json!("farm")]);
        assert_eq!(snapshot.current_turn_id, Some(2));
        assert_eq!(snapshot.round, 1);
    }

    #[test]
    fn test_out_of_turn_end_turn_is_silent() {
        let mut dispatcher = dispatcher();
        let mut first = connect(&mut dispatcher, 1);
        let mut second = connect(&mut dispatcher, 2);
        drain(&mut first);
        drain(&mut second);

        dispatcher.handle_event(end_turn(2, 1));

        assert!(drain(&mut first).is_empty());
        assert!(drain(&mut second).is_empty());
        assert_eq!(dispatcher.session().player(2).unwrap().gold, 1000);
        assert_eq!(dispatcher.session().current_turn_id(), Some(1));
    }

    #[test]
    fn test_disconnect_broadcasts_to_remaining() {
        let mut dispatcher = dispatcher();
        let mut first = connect(&mut dispatcher, 1);
        let mut second = connect(&mut dispatcher, 2);
        let _third = connect(&mut dispatcher, 3);
        dispatcher.handle_event(end_turn(1, 900));
        drain(&mut first);
        drain(&mut second);

        dispatcher.handle_event(NetworkEvent::Disconnected { connection_id: 2 });

        let snapshot = last_snapshot(&mut first);
        assert_eq!(snapshot.players.len(), 2);
        assert_eq!(snapshot.current_turn_id, Some(3));
        assert!(second.try_recv().is_err());
    }
}
