//! Command processing: validates and applies client commands.

use protocol::{Building, ClientCommand, EntityId, GameState, PlayerId};
use thiserror::Error;

/// Reasons a client command is rejected. Rejection never closes the
/// connection; the command is simply dropped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// The command references an entity the issuing player does not own.
    #[error("player {player} does not own entity {entity}")]
    Unauthorized { player: PlayerId, entity: EntityId },

    /// The command references a player or entity that does not exist.
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),
}

/// Validate and apply one command to the game state.
///
/// Synchronous and non-suspending; the caller holds the state lock for
/// the duration, which makes each command atomic with respect to the
/// tick walk. A rejected command leaves the state untouched.
pub fn process(
    state: &mut GameState,
    player: PlayerId,
    command: ClientCommand,
) -> Result<(), CommandError> {
    if !state.players.contains_key(&player) {
        // Connection raced its own teardown; nothing to apply to.
        return Err(CommandError::UnknownEntity(player));
    }

    match command {
        ClientCommand::SetName { name } => {
            if let Some(p) = state.players.get_mut(&player) {
                p.name = name;
            }
        }
        ClientCommand::MoveUnit { unit, pos } => {
            // Resolve the unit globally first, so a unit owned by
            // someone else rejects as unauthorized rather than unknown.
            match state.unit_owner(unit) {
                Some(owner) if owner == player => {
                    if let Some(u) = state
                        .players
                        .get_mut(&player)
                        .and_then(|p| p.unit_mut(unit))
                    {
                        u.pos = pos;
                    }
                }
                Some(_) => return Err(CommandError::Unauthorized { player, entity: unit }),
                None => return Err(CommandError::UnknownEntity(unit)),
            }
        }
        ClientCommand::PlaceBuilding { building, pos } => {
            let id = state.alloc_entity_id();
            if let Some(p) = state.players.get_mut(&player) {
                p.buildings.push(Building::new(id, building, pos));
            }
        }
    }

    Ok(())
}
