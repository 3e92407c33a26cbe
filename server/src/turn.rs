//! Turn policy over the session registry.
//!
//! Holds no state of its own: whose turn it is lives entirely in the
//! [`Session`], this module only decides who may act on it.

use crate::session::Session;
use rand::Rng;
use shared::{ConnectionId, PlayerUpdate};
use thiserror::Error;

/// An end-turn from a connection that does not hold the turn
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("connection {connection_id} tried to end turn {current_turn_id:?}")]
pub struct TurnViolation {
    pub connection_id: ConnectionId,
    pub current_turn_id: Option<ConnectionId>,
}

/// Returns true if the connection holds the turn
///
/// Always false while nobody is playing.
pub fn is_current_turn<R: Rng>(session: &Session<R>, connection_id: ConnectionId) -> bool {
    session.current_turn_id() == Some(connection_id)
}

/// Ends the caller's turn, storing its reported resources first
///
/// A missing update still passes the turn on. When the caller is not the
/// current turn holder nothing changes and a [`TurnViolation`] is returned.
pub fn end_turn<R: Rng>(
    session: &mut Session<R>,
    connection_id: ConnectionId,
    update: Option<PlayerUpdate>,
) -> Result<(), TurnViolation> {
    if !is_current_turn(session, connection_id) {
        return Err(TurnViolation {
            connection_id,
            current_turn_id: session.current_turn_id(),
        });
    }

    if let Some(update) = update {
        session.apply_turn_update(connection_id, update);
    }
    session.advance_turn();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn session_with(ids: &[ConnectionId]) -> Session<StdRng> {
        let mut session = Session::with_rng(Catalog::standard(), StdRng::seed_from_u64(5));
        for id in ids {
            session.admit(*id).unwrap();
        }
        session
    }

    fn farm_update() -> PlayerUpdate {
        PlayerUpdate {
            gold: 900,
            troops: 2,
            buildings: vec![json!("farm")],
        }
    }

    #[test]
    fn test_is_current_turn() {
        let session = session_with(&[1, 2]);

        assert!(is_current_turn(&session, 1));
        assert!(!is_current_turn(&session, 2));
        assert!(!is_current_turn(&session, 3));
    }

    #[test]
    fn test_nobody_holds_turn_in_empty_session() {
        let session = session_with(&[]);

        assert!(!is_current_turn(&session, 1));
    }

    #[test]
    fn test_end_turn_passes_to_next_player() {
        let mut session = session_with(&[1, 2]);

        assert_ok!(end_turn(&mut session, 1, Some(farm_update())));

        let player = session.player(1).unwrap();
        assert_eq!(player.gold, 900);
        assert_eq!(player.troops, 2);
        assert_eq!(player.buildings, vec![json!("farm")]);
        assert_eq!(session.current_turn_id(), Some(2));
        assert_eq!(session.round(), 1);
    }

    #[test]
    fn test_lone_player_starts_new_round() {
        let mut session = session_with(&[1]);

        assert_ok!(end_turn(&mut session, 1, Some(farm_update())));

        assert_eq!(session.current_turn_id(), Some(1));
        assert_eq!(session.round(), 2);
    }

    #[test]
    fn test_end_turn_out_of_turn_changes_nothing() {
        let mut session = session_with(&[1, 2, 3]);
        let before = session.snapshot();

        let violation = assert_err!(end_turn(&mut session, 2, Some(farm_update())));

        assert_eq!(
            violation,
            TurnViolation {
                connection_id: 2,
                current_turn_id: Some(1),
            }
        );
        assert_eq!(session.current_turn_index(), 0);
        assert_eq!(session.player(2), before.players.iter().find(|p| p.socket_id == 2));
        assert_eq!(session.round(), before.round);
    }

    #[test]
    fn test_end_turn_without_update_keeps_resources() {
        let mut session = session_with(&[1, 2]);

        assert_ok!(end_turn(&mut session, 1, None));

        assert_eq!(session.player(1).unwrap().gold, 1000);
        assert_eq!(session.current_turn_id(), Some(2));
    }

    #[test]
    fn test_index_advances_modulo_order_length() {
        let mut session = session_with(&[1, 2, 3, 4]);

        for step in 0..12 {
            let old_index = session.current_turn_index();
            let old_round = session.round();
            let holder = session.current_turn_id().unwrap();

            assert_ok!(end_turn(&mut session, holder, None));

            let new_index = session.current_turn_index();
            assert_eq!(new_index, (old_index + 1) % 4, "step {}", step);
            if new_index == 0 {
                assert_eq!(session.round(), old_round + 1);
            } else {
                assert_eq!(session.round(), old_round);
            }
        }

        assert_eq!(session.round(), 4);
    }
}
