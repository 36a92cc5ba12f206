//! Broadcast dispatcher: fans the current state out to every live
//! connection.

use crate::server::game::ServerState;
use protocol::PlayerId;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};
use tracing::{error, warn};

/// Serialize the game state once and push the payload to every
/// connection in the registry snapshot.
///
/// The payload is shared read-only; per-connection socket writes
/// happen concurrently in the session tasks, so the tick never blocks
/// on network I/O. A connection whose outbound queue is closed or full
/// is treated as disconnected and unregistered; delivery to the
/// remaining connections is unaffected and no error reaches the tick
/// loop.
pub fn broadcast(state: &mut ServerState) {
    if state.registry.is_empty() {
        return;
    }

    let payload: Utf8Bytes = match protocol::encode_state(&state.game) {
        Ok(json) => json.into(),
        Err(e) => {
            error!("Skipping broadcast: {}", e);
            return;
        }
    };

    let mut dead: Vec<PlayerId> = Vec::new();
    for (player, outbound) in state.registry.snapshot() {
        match outbound.try_send(Message::Text(payload.clone())) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Player {} send queue full, dropping connection", player);
                dead.push(player);
            }
            Err(TrySendError::Closed(_)) => {
                dead.push(player);
            }
        }
    }

    // Unregistering drops the registry's sender, which lets the
    // session task observe the closed channel and shut the socket.
    for player in dead {
        state.remove_player(player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tokio::sync::mpsc;

    #[test]
    fn test_failed_send_removes_only_that_connection() {
        let mut state = ServerState::new(Config::default());

        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, rx2) = mpsc::channel(8);
        let (tx3, mut rx3) = mpsc::channel(8);
        let p1 = state.add_player(tx1);
        let p2 = state.add_player(tx2);
        let p3 = state.add_player(tx3);

        // Simulate a dead client: its session task is gone.
        drop(rx2);

        broadcast(&mut state);

        assert!(matches!(rx1.try_recv().unwrap(), Message::Text(_)));
        assert!(matches!(rx3.try_recv().unwrap(), Message::Text(_)));
        assert_eq!(state.registry.len(), 2);
        assert!(state.game.players.contains_key(&p1));
        assert!(!state.game.players.contains_key(&p2));
        assert!(state.game.players.contains_key(&p3));
    }

    #[test]
    fn test_stalled_connection_is_dropped() {
        let mut state = ServerState::new(Config::default());

        let (tx, _rx) = mpsc::channel(1);
        let stalled = state.add_player(tx);
        let (tx, mut rx) = mpsc::channel(8);
        let healthy = state.add_player(tx);

        // First broadcast fills the stalled client's queue; the second
        // finds it full and drops the connection.
        broadcast(&mut state);
        broadcast(&mut state);

        assert_eq!(state.registry.len(), 1);
        assert!(!state.game.players.contains_key(&stalled));
        assert!(state.game.players.contains_key(&healthy));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_payload_is_current_state() {
        let mut state = ServerState::new(Config::default());
        let (tx, mut rx) = mpsc::channel(8);
        let player = state.add_player(tx);

        broadcast(&mut state);

        let Message::Text(payload) = rx.try_recv().unwrap() else {
            panic!("expected text frame");
        };
        let value: serde_json::Value = serde_json::from_str(payload.as_str()).unwrap();
        assert!(value["players"][player.to_string()].is_object());
    }
}
