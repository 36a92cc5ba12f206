//! Periodic unit production.

use super::{EffectError, PeriodicEffect};
use protocol::{BuildingKind, EntityId, GameState, PlayerId, Unit, UnitKind};

/// The stock periodic effect: a firing building produces one unit of a
/// kind determined by the building, at the building's position.
pub struct UnitProduction;

impl UnitProduction {
    fn produced_kind(kind: BuildingKind) -> UnitKind {
        match kind {
            BuildingKind::Headquarters => UnitKind::Worker,
            BuildingKind::Barracks => UnitKind::Soldier,
        }
    }
}

impl PeriodicEffect for UnitProduction {
    fn fire(
        &self,
        state: &mut GameState,
        player: PlayerId,
        building: EntityId,
    ) -> Result<(), EffectError> {
        let unit_id = state.alloc_entity_id();
        let p = state
            .players
            .get_mut(&player)
            .ok_or_else(|| EffectError(format!("player {player} not in state")))?;
        let (kind, pos) = {
            let b = p
                .building(building)
                .ok_or_else(|| EffectError(format!("building {building} not found")))?;
            (Self::produced_kind(b.kind), b.pos)
        };
        p.units.push(Unit {
            id: unit_id,
            kind,
            pos,
        });
        Ok(())
    }
}
