//! Client -> server command definitions.

use crate::{BuildingKind, EntityId, Pos};
use serde::{Deserialize, Serialize};

/// A command issued by a connected client.
///
/// Commands arrive as internally tagged JSON objects, e.g.
/// `{"type": "move_unit", "unit": 3, "pos": [4, 5]}`. Anything that
/// does not match one of these shapes is rejected as malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Set the player's display name.
    SetName { name: String },
    /// Move an owned unit to a new position.
    MoveUnit { unit: EntityId, pos: Pos },
    /// Place a new building at a position.
    PlaceBuilding { building: BuildingKind, pos: Pos },
}
