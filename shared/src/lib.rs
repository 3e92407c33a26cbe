//! Wire protocol and data model shared by the Hegemony server and its clients.
//!
//! Every frame on the WebSocket is a JSON text message tagged with the event
//! name and carrying its payload under `data`:
//!
//! ```json
//! {"event": "end_turn", "data": {"updatedPlayer": {"gold": 900, "troops": 2, "buildings": ["farm"]}}}
//! ```

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

/// Maximum number of participants holding a hero at the same time.
pub const MAX_PLAYERS: usize = 4;
pub const STARTING_GOLD: i64 = 1000;
pub const STARTING_TROOPS: i64 = 0;
/// Port used when neither `--port` nor `PORT` is given.
pub const DEFAULT_PORT: u16 = 3001;

/// Opaque identifier of one live connection, assigned by the transport.
pub type ConnectionId = u32;

/// A connected participant and the hero it was assigned.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    /// Hero identity key, unique among connected players
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub color: String,
    pub bg: String,
    pub gold: i64,
    pub troops: i64,
    pub socket_id: ConnectionId,
    /// Buildings are owned by the client and forwarded verbatim
    pub buildings: Vec<Value>,
}

impl PlayerRecord {
    /// Overwrites the resource fields with values submitted by the client.
    ///
    /// Identity and display fields are never touched.
    pub fn apply_update(&mut self, update: PlayerUpdate) {
        self.gold = update.gold;
        self.troops = update.troops;
        self.buildings = update.buildings;
    }
}

/// Resources a player reports when ending its turn.
///
/// Fractional amounts are truncated toward zero.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerUpdate {
    #[serde(deserialize_with = "whole_amount")]
    pub gold: i64,
    #[serde(deserialize_with = "whole_amount")]
    pub troops: i64,
    #[serde(default)]
    pub buildings: Vec<Value>,
}

fn whole_amount<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = Number::deserialize(deserializer)?;
    number
        .as_i64()
        .or_else(|| number.as_f64().map(|amount| amount as i64))
        .ok_or_else(|| de::Error::custom(format!("invalid amount {}", number)))
}

/// Reads `updatedPlayer`, treating a payload that is not a valid update as
/// absent so the turn still ends.
fn lenient_update<'de, D>(deserializer: D) -> Result<Option<PlayerUpdate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}

/// Client-safe projection of the whole session.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub players: Vec<PlayerRecord>,
    pub current_turn_id: Option<ConnectionId>,
    pub round: u32,
}

/// Messages sent by clients.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    EndTurn {
        #[serde(rename = "updatedPlayer", default, deserialize_with = "lenient_update")]
        updated_player: Option<PlayerUpdate>,
    },
}

/// Messages sent by the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    InitPlayer(PlayerRecord),
    GameFull { message: String },
    GameStateUpdate(GameSnapshot),
}

impl ClientMessage {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl ServerMessage {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
