//! Headless bot that joins a game and plays a fixed number of turns.
//!
//! Each turn it spends some gold on troops and a random building, then
//! hands the turn on. Useful for filling a lobby while testing a real client.

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use rand::seq::SliceRandom;
use serde_json::json;
use shared::{ClientMessage, PlayerRecord, PlayerUpdate, ServerMessage, DEFAULT_PORT};
use std::time::Duration;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

const BUILDINGS: [&str; 4] = ["farm", "mine", "barracks", "market"];

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket URL of the server
    #[arg(short = 's', long, default_value_t = format!("ws://127.0.0.1:{}", DEFAULT_PORT))]
    server: String,

    /// Number of turns to play before leaving
    #[arg(short = 't', long, default_value = "3")]
    turns: u32,

    /// Pause before ending each turn, in milliseconds
    #[arg(short = 'd', long, default_value = "500")]
    delay: u64,
}

/// Decides what the bot reports at the end of its turn
fn plan_turn(player: &PlayerRecord) -> PlayerUpdate {
    let mut buildings = player.buildings.clone();
    if let Some(kind) = BUILDINGS.choose(&mut rand::thread_rng()) {
        buildings.push(json!(kind));
    }

    PlayerUpdate {
        gold: (player.gold - 100).max(0),
        troops: player.troops + 1,
        buildings,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Connecting to {}", args.server);
    let (ws_stream, _) = connect_async(args.server.as_str()).await?;
    let (mut write, mut read) = ws_stream.split();

    let mut me: Option<PlayerRecord> = None;
    let mut turns_played = 0;

    while let Some(frame) = read.next().await {
        let text = match frame? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let message = match ServerMessage::from_json(&text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Ignoring unexpected message: {}", e);
                continue;
            }
        };

        match message {
            ServerMessage::InitPlayer(player) => {
                info!(
                    "Playing as {} ({}) with connection {}",
                    player.name, player.avatar, player.socket_id
                );
                me = Some(player);
            }
            ServerMessage::GameFull { message } => {
                info!("Server turned us away: {}", message);
                break;
            }
            ServerMessage::GameStateUpdate(snapshot) => {
                info!(
                    "Round {}, {} players, turn: {:?}",
                    snapshot.round,
                    snapshot.players.len(),
                    snapshot.current_turn_id
                );

                let Some(socket_id) = me.as_ref().map(|p| p.socket_id) else {
                    continue;
                };
                if snapshot.current_turn_id != Some(socket_id) {
                    continue;
                }
                let Some(current) = snapshot.players.iter().find(|p| p.socket_id == socket_id)
                else {
                    continue;
                };

                if turns_played >= args.turns {
                    info!("Played {} turns, leaving", turns_played);
                    break;
                }

                sleep(Duration::from_millis(args.delay)).await;

                let update = plan_turn(current);
                info!(
                    "Ending turn with {} gold, {} troops, {} buildings",
                    update.gold,
                    update.troops,
                    update.buildings.len()
                );
                let end_turn = ClientMessage::EndTurn {
                    updated_player: Some(update),
                };
                write.send(Message::Text(end_turn.to_json()?)).await?;
                turns_played += 1;
            }
        }
    }

    write.send(Message::Close(None)).await.ok();
    info!("Test client finished");

    Ok(())
}
