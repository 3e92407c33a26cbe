//! Session registry: the single authoritative record of who is playing
//!
//! This module owns everything the server knows about the running game:
//! - Which connection holds which hero (player records)
//! - The order in which connections take their turns
//! - Whose turn it is and how many rounds have been played
//!
//! All three are kept in one structure so membership and the turn pointer
//! can never drift apart. Every mutating operation takes `&mut self`, and
//! the server event loop is the only owner, so operations never interleave.

use crate::assignment::pick_available;
use crate::catalog::Catalog;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{ConnectionId, GameSnapshot, PlayerRecord, PlayerUpdate, MAX_PLAYERS};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Reasons a connection cannot be given a hero
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("La partida está llena ({max}/{max})", max = MAX_PLAYERS)]
    Full,
    #[error("Error: No quedan héroes disponibles.")]
    CatalogExhausted,
    #[error("Connection already holds a hero")]
    AlreadyJoined,
}

/// A broken structural invariant, reported by [`Session::check_invariants`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("player {0} is missing from the turn order")]
    MissingFromTurnOrder(ConnectionId),
    #[error("connection {0} is in the turn order without a player")]
    OrphanInTurnOrder(ConnectionId),
    #[error("connection {0} appears more than once in the turn order")]
    DuplicateInTurnOrder(ConnectionId),
    #[error("{0} players exceed the capacity of {max}", max = MAX_PLAYERS)]
    OverCapacity(usize),
    #[error("hero {0} is held by more than one player")]
    SharedHero(String),
    #[error("turn index {index} is out of range for {len} players")]
    TurnIndexOutOfRange { index: usize, len: usize },
    #[error("round counter is zero")]
    ZeroRound,
}

/// Shared turn-based game state
///
/// Generic over the random source used for hero assignment; production code
/// uses an entropy-seeded [`StdRng`], tests inject their own generator.
pub struct Session<R: Rng = StdRng> {
    /// Player records indexed by the connection that owns them
    players: HashMap<ConnectionId, PlayerRecord>,
    /// Rotation of connections, in join order
    turn_order: Vec<ConnectionId>,
    /// Offset into `turn_order` of the connection whose turn it is
    current_turn_index: usize,
    /// Starts at 1, incremented every time the turn wraps around
    round: u32,
    catalog: Catalog,
    rng: R,
}

impl Session<StdRng> {
    /// Creates an empty session over the standard hero catalog
    pub fn new() -> Self {
        Self::with_rng(Catalog::standard(), StdRng::from_entropy())
    }
}

impl Default for Session<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> Session<R> {
    /// Creates an empty session with an explicit catalog and random source
    pub fn with_rng(catalog: Catalog, rng: R) -> Self {
        Self {
            players: HashMap::new(),
            turn_order: Vec::new(),
            current_turn_index: 0,
            round: 1,
            catalog,
            rng,
        }
    }

    /// Admits a new connection and assigns it a free hero
    ///
    /// The new player is appended to the end of the turn order. Fails with
    /// [`Rejection::Full`] at capacity and [`Rejection::CatalogExhausted`]
    /// when every hero is taken; the session is unchanged in both cases.
    pub fn admit(&mut self, connection_id: ConnectionId) -> Result<PlayerRecord, Rejection> {
        if self.players.contains_key(&connection_id) {
            return Err(Rejection::AlreadyJoined);
        }

        if self.players.len() >= MAX_PLAYERS {
            return Err(Rejection::Full);
        }

        let in_use: HashSet<&str> = self.players.values().map(|p| p.id.as_str()).collect();
        let hero = pick_available(&self.catalog, &in_use, &mut self.rng)
            .ok_or(Rejection::CatalogExhausted)?;

        let record = hero.instantiate(connection_id);
        info!("Assigned {} to connection {}", hero.name, connection_id);

        self.players.insert(connection_id, record.clone());
        self.turn_order.push(connection_id);
        debug_assert_eq!(self.check_invariants(), Ok(()));

        Ok(record)
    }

    /// Overwrites the resources of the current turn holder
    ///
    /// Returns false without touching anything when `connection_id` is not
    /// the connection whose turn it is.
    pub fn apply_turn_update(&mut self, connection_id: ConnectionId, update: PlayerUpdate) -> bool {
        if self.current_turn_id() != Some(connection_id) {
            return false;
        }

        match self.players.get_mut(&connection_id) {
            Some(player) => {
                player.apply_update(update);
                true
            }
            None => false,
        }
    }

    /// Moves the turn pointer to the next connection
    ///
    /// Wrapping back to the first connection starts a new round.
    pub fn advance_turn(&mut self) {
        if self.turn_order.is_empty() {
            return;
        }

        self.current_turn_index += 1;
        if self.current_turn_index >= self.turn_order.len() {
            self.current_turn_index = 0;
            self.round += 1;
        }
        debug_assert_eq!(self.check_invariants(), Ok(()));
    }

    /// Removes a connection and its player record
    ///
    /// Returns false if the connection never held a hero. The turn index is
    /// only reset when it falls off the end of the shortened order, so
    /// removing a player before the pointer hands the turn to whoever now
    /// sits at the same offset.
    pub fn remove(&mut self, connection_id: ConnectionId) -> bool {
        let Some(player) = self.players.remove(&connection_id) else {
            return false;
        };

        self.turn_order.retain(|id| *id != connection_id);
        if self.current_turn_index >= self.turn_order.len() {
            self.current_turn_index = 0;
        }

        info!("Removed {} (connection {})", player.name, connection_id);
        debug_assert_eq!(self.check_invariants(), Ok(()));
        true
    }

    /// Connection whose turn it is, None while nobody is playing
    pub fn current_turn_id(&self) -> Option<ConnectionId> {
        self.turn_order.get(self.current_turn_index).copied()
    }

    pub fn current_turn_index(&self) -> usize {
        self.current_turn_index
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn turn_order(&self) -> &[ConnectionId] {
        &self.turn_order
    }

    pub fn player(&self, connection_id: ConnectionId) -> Option<&PlayerRecord> {
        self.players.get(&connection_id)
    }

    /// Hero ids currently held by connected players
    pub fn in_use_hero_ids(&self) -> HashSet<&str> {
        self.players.values().map(|p| p.id.as_str()).collect()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Returns the number of players holding a hero
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Returns true if nobody holds a hero
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Client-safe projection of the whole session
    ///
    /// Players are listed in map iteration order, not turn order.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            players: self.players.values().cloned().collect(),
            current_turn_id: self.current_turn_id(),
            round: self.round,
        }
    }

    /// Verifies the structural invariants of the session
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.players.len() > MAX_PLAYERS {
            return Err(InvariantViolation::OverCapacity(self.players.len()));
        }

        let mut seen = HashSet::new();
        for id in &self.turn_order {
            if !seen.insert(*id) {
                return Err(InvariantViolation::DuplicateInTurnOrder(*id));
            }
            if !self.players.contains_key(id) {
                return Err(InvariantViolation::OrphanInTurnOrder(*id));
            }
        }

        if let Some(id) = self.players.keys().find(|id| !seen.contains(*id)) {
            return Err(InvariantViolation::MissingFromTurnOrder(*id));
        }

        let mut heroes = HashSet::new();
        for player in self.players.values() {
            if !heroes.insert(player.id.as_str()) {
                return Err(InvariantViolation::SharedHero(player.id.clone()));
            }
        }

        let len = self.turn_order.len();
        let index = self.current_turn_index;
        if (len == 0 && index != 0) || (len > 0 && index >= len) {
            return Err(InvariantViolation::TurnIndexOutOfRange { index, len });
        }

        if self.round == 0 {
            return Err(InvariantViolation::ZeroRound);
        }

        Ok(())
    }
}
