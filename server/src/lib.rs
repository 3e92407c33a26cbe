//! # Hegemony Session Server
//!
//! Authoritative server for a turn-based multiplayer strategy game. Up to
//! four players connect over WebSocket, each is handed a hero nobody else
//! holds, and the server keeps the one shared game state: who is playing,
//! whose turn it is, and which round the game is in. Every change is pushed
//! to all connections as a full snapshot.
//!
//! ## Core Responsibilities
//!
//! ### Hero Assignment
//! Connecting players receive a random hero from a fixed catalog. Heroes are
//! exclusive, and the fifth concurrent connection is turned away with a
//! `game_full` message.
//!
//! ### Turn Bookkeeping
//! Players act in join order. Only the current turn holder may end its turn;
//! anyone else is ignored. Wrapping back to the first player starts a new
//! round. Leaving players are cut out of the rotation.
//!
//! ### State Broadcasting
//! After every join, completed turn and departure the server sends a
//! `game_state_update` with all players, the current turn holder and the
//! round number. There is no diffing; each update replaces the last.
//!
//! ## Architecture Design
//!
//! ### Single Owner Event Loop
//! One task owns the session. Connection tasks forward their events to it
//! over a channel, so session operations run one at a time and never see
//! each other half-finished. Outbound frames go through per-connection
//! queues, so a slow client never holds up the loop.
//!
//! ### Trusted Clients
//! Resources reported at the end of a turn are stored as sent. The server
//! does not validate game rules.
//!
//! ## Module Organization
//!
//! - `catalog`: the static hero table
//! - `assignment`: random pick among free heroes
//! - `session`: players, turn order, turn pointer and round counter
//! - `turn`: who may end a turn, and what ending one does
//! - `broadcast`: per-connection outbound queues
//! - `dispatch`: maps connect, message and disconnect events onto the session
//! - `network`: WebSocket listener and connection tasks
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let server = Server::new("0.0.0.0:3001").await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod assignment;
pub mod broadcast;
pub mod catalog;
pub mod dispatch;
pub mod network;
pub mod session;
pub mod turn;
