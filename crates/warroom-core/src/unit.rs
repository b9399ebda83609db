use serde::{Deserialize, Serialize};
use warroom_protocol::{MovementClass, PlayerId, Position, UnitId, UnitSnapshot, UnitTypeId};

use crate::rules::UnitType;

pub const MAX_HP: i32 = 100;

/// Health as shown to players: internal health rounded up to tenths.
pub fn display_hp(hp: i32) -> i32 {
    (hp.max(0) + 9) / 10
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub unit_type: UnitTypeId,
    pub class: MovementClass,
    pub owner: PlayerId,
    /// `None` while carried by a transport.
    pub pos: Option<Position>,
    pub hp: i32,
    pub fuel: i32,
    pub ammo: i32,
    pub moved: bool,
    pub acted: bool,
    pub hidden: bool,
    pub cargo: Vec<UnitId>,
    pub carried_by: Option<UnitId>,
}

impl Unit {
    /// A freshly built unit at full health and supply.
    pub fn new(id: UnitId, utype: &UnitType, owner: PlayerId, pos: Position) -> Self {
        Self {
            id,
            unit_type: utype.id,
            class: utype.movement_class,
            owner,
            pos: Some(pos),
            hp: MAX_HP,
            fuel: utype.max_fuel,
            ammo: utype.max_ammo,
            moved: false,
            acted: false,
            hidden: false,
            cargo: Vec::new(),
            carried_by: None,
        }
    }

    pub fn from_snapshot(snapshot: &UnitSnapshot, utype: &UnitType) -> Self {
        Self {
            id: snapshot.id,
            unit_type: snapshot.unit_type,
            class: utype.movement_class,
            owner: snapshot.owner,
            pos: snapshot.pos,
            hp: snapshot.hp,
            fuel: snapshot.fuel.unwrap_or(utype.max_fuel),
            ammo: snapshot.ammo.unwrap_or(utype.max_ammo),
            moved: snapshot.moved,
            acted: snapshot.acted,
            hidden: snapshot.hidden,
            cargo: Vec::new(),
            carried_by: snapshot.carried_by,
        }
    }

    pub fn to_snapshot(&self) -> UnitSnapshot {
        UnitSnapshot {
            id: self.id,
            unit_type: self.unit_type,
            owner: self.owner,
            pos: self.pos,
            hp: self.hp,
            fuel: Some(self.fuel),
            ammo: Some(self.ammo),
            moved: self.moved,
            acted: self.acted,
            hidden: self.hidden,
            carried_by: self.carried_by,
        }
    }

    pub fn display_hp(&self) -> i32 {
        display_hp(self.hp)
    }

    pub fn resupply(&mut self, utype: &UnitType) {
        self.fuel = utype.max_fuel;
        self.ammo = utype.max_ammo;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_hp_rounds_up() {
        assert_eq!(display_hp(100), 10);
        assert_eq!(display_hp(91), 10);
        assert_eq!(display_hp(90), 9);
        assert_eq!(display_hp(1), 1);
        assert_eq!(display_hp(0), 0);
        assert_eq!(display_hp(-5), 0);
    }
}
