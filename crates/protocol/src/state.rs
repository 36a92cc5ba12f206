//! In-memory simulation state: players, units, buildings.
//!
//! Pure data plus invariants. Nothing here performs I/O or suspends;
//! the tick engine and command processor in the server crate are the
//! only mutators.

use crate::{EntityId, PlayerId, Pos};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default interval between periodic building effects, in simulation
/// time-units.
pub const DEFAULT_TICK_INTERVAL: u64 = 1000;

/// Root of the authoritative game state. Exactly one instance exists
/// for the server's lifetime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameState {
    /// Connected players, keyed by id. Ids are assigned monotonically,
    /// so iteration order equals registration order.
    pub players: BTreeMap<PlayerId, Player>,
    /// Next unit/building id. Kept in the state so entity allocation
    /// stays reproducible for identical replayed inputs.
    #[serde(skip)]
    pub next_entity_id: EntityId,
}

impl GameState {
    /// Allocate the next globally unique entity id.
    pub fn alloc_entity_id(&mut self) -> EntityId {
        self.next_entity_id += 1;
        self.next_entity_id
    }

    /// Resolve the owner of a unit, if the unit exists anywhere.
    pub fn unit_owner(&self, unit: EntityId) -> Option<PlayerId> {
        self.players
            .values()
            .find(|p| p.units.iter().any(|u| u.id == unit))
            .map(|p| p.id)
    }
}

/// A connected player and everything it owns. Created at registration,
/// removed at disconnect; removal cascades to units and buildings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub units: Vec<Unit>,
    pub buildings: Vec<Building>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            units: Vec::new(),
            buildings: Vec::new(),
        }
    }

    pub fn unit_mut(&mut self, id: EntityId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    pub fn building(&self, id: EntityId) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == id)
    }
}

/// Enumerated unit kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Worker,
    Soldier,
}

/// Enumerated building kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    Headquarters,
    Barracks,
}

/// A mobile entity owned by a player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub kind: UnitKind,
    pub pos: Pos,
}

/// A stationary entity with a periodic effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub kind: BuildingKind,
    pub pos: Pos,
    /// Simulation time-units between effect firings.
    #[serde(default = "default_tick_interval")]
    pub tick_interval: u64,
    /// Simulation time of the last firing. Monotonically
    /// non-decreasing; only advances when an effect actually fires.
    #[serde(default)]
    pub last_tick: u64,
}

fn default_tick_interval() -> u64 {
    DEFAULT_TICK_INTERVAL
}

impl Building {
    pub fn new(id: EntityId, kind: BuildingKind, pos: Pos) -> Self {
        Self {
            id,
            kind,
            pos,
            tick_interval: DEFAULT_TICK_INTERVAL,
            last_tick: 0,
        }
    }

    /// Returns whether the periodic effect fires at `now`.
    ///
    /// Fires iff a full interval has elapsed since `last_tick`, and at
    /// most once per call: intervals skipped by scheduler delay are
    /// lost, not queued.
    pub fn advance(&mut self, now: u64) -> bool {
        if now.saturating_sub(self.last_tick) >= self.tick_interval {
            self.last_tick = now;
            return true;
        }
        false
    }
}
