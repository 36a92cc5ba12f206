//! Shared protocol crate for the RTS server.
//!
//! This crate contains:
//! - The simulation state model (players, units, buildings)
//! - Client command definitions
//! - JSON codec for state snapshots and inbound commands

mod codec;
mod command;
mod error;
mod state;

pub use codec::{decode_command, encode_state};
pub use command::ClientCommand;
pub use error::ProtocolError;
pub use state::{Building, BuildingKind, GameState, Player, Unit, UnitKind, DEFAULT_TICK_INTERVAL};

/// Unique player identifier, assigned at registration.
pub type PlayerId = u32;

/// Unique entity (unit or building) identifier.
pub type EntityId = u32;

/// Integer 2D position on the game grid.
pub type Pos = glam::IVec2;
