//! Gameplay rule extension points.
//!
//! The tick/broadcast core knows nothing about concrete game rules: a
//! firing building is handed to a [`PeriodicEffect`] implementation,
//! which mutates the game state however the gameplay layer decides.

mod production;

pub use production::UnitProduction;

use protocol::{EntityId, GameState, PlayerId};
use thiserror::Error;

/// Error raised while applying one building's periodic effect. The
/// tick engine logs it and continues with the remaining entities.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct EffectError(pub String);

/// A building behavior that runs whenever the building's interval has
/// elapsed.
pub trait PeriodicEffect: Send + Sync {
    /// Apply the effect of `building` (owned by `player`) firing.
    fn fire(
        &self,
        state: &mut GameState,
        player: PlayerId,
        building: EntityId,
    ) -> Result<(), EffectError>;
}

/// The default rule set.
pub fn default_rules() -> Box<dyn PeriodicEffect> {
    Box::new(UnitProduction)
}
