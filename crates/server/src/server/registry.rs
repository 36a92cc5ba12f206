//! Connection registry: binds live transport connections to players.

use protocol::{GameState, Player, PlayerId};
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

/// Outbound handle for one live connection. The session task owns the
/// receiving end and pumps frames onto the socket, so registry users
/// never touch the network directly.
pub type Outbound = mpsc::Sender<Message>;

/// Maps live connections to player identities.
///
/// Lives under the same lock as the game state, so binding and
/// teardown are atomic: every player id present in the state has
/// exactly one live connection here until [`unregister`] removes both.
///
/// [`unregister`]: ConnectionRegistry::unregister
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: BTreeMap<PlayerId, Outbound>,
    next_player_id: PlayerId,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Allocate the next player id. Ids strictly increase and are
    /// never reused within the server's lifetime, so in-flight
    /// messages can never be attributed to a later player.
    fn alloc_player_id(&mut self) -> PlayerId {
        self.next_player_id += 1;
        self.next_player_id
    }

    /// Bind a connection and create its player entity in one step.
    /// Must complete before any message from the connection is
    /// processed.
    pub fn register(&mut self, state: &mut GameState, outbound: Outbound) -> PlayerId {
        let id = self.alloc_player_id();
        state.players.insert(id, Player::new(id, format!("player-{id}")));
        self.connections.insert(id, outbound);
        debug!("Registered player {}", id);
        id
    }

    /// Remove a connection and its player, cascading to owned units
    /// and buildings. Idempotent: unregistering an unknown id is a
    /// no-op.
    pub fn unregister(&mut self, state: &mut GameState, id: PlayerId) {
        if self.connections.remove(&id).is_some() {
            debug!("Unregistered player {}", id);
        }
        state.players.remove(&id);
    }

    /// Point-in-time view of the live connections, in registration
    /// order. Connections mid-teardown do not appear.
    pub fn snapshot(&self) -> Vec<(PlayerId, Outbound)> {
        self.connections
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect()
    }
}
