use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use warroom_protocol::{
    BuildingId, BuildingTag, CatalogId, CoId, CoTag, CountryId, CountryTag, MovementClass,
    PowerKind, TerrainId, TerrainTag, UnitTypeId, UnitTypeTag, Weather,
};

use crate::rules::{CatalogEntry, CatalogError, CatalogKind};

fn default_sight_cost() -> i32 {
    1
}

fn default_capture_points() -> i32 {
    20
}

fn default_range() -> i32 {
    1
}

fn default_cost_percent() -> i32 {
    100
}

fn default_luck_max() -> i32 {
    9
}

fn check_movement_costs(
    kind: CatalogKind,
    id: u32,
    costs: &BTreeMap<MovementClass, i32>,
) -> Result<(), CatalogError> {
    if let Some((class, cost)) = costs.iter().find(|(_, cost)| **cost < 0) {
        return Err(CatalogError::invalid(
            kind,
            id,
            "movement_costs",
            format!("has negative cost {cost} for {class:?}"),
        ));
    }
    Ok(())
}

fn check_non_negative(
    kind: CatalogKind,
    id: u32,
    field: &'static str,
    value: i32,
) -> Result<(), CatalogError> {
    if value < 0 {
        return Err(CatalogError::invalid(
            kind,
            id,
            field,
            format!("must not be negative (got {value})"),
        ));
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// Terrain
// -----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawTerrain {
    pub id: u32,
    pub name: String,
    pub base_defence: i32,
    #[serde(default)]
    pub sight_distance_increase: i32,
    /// `-1` is accepted as "no limit".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fog_sight_limit: Option<i32>,
    #[serde(default = "default_sight_cost")]
    pub sight_cost: i32,
    pub movement_costs: BTreeMap<MovementClass, i32>,
    #[serde(default)]
    pub base_texture: String,
    #[serde(default)]
    pub fog_texture: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Terrain {
    pub id: TerrainId,
    pub name: String,
    pub base_defence: i32,
    pub sight_distance_increase: i32,
    /// Units on this tile can only be spotted from within this distance.
    pub fog_sight_limit: Option<i32>,
    pub sight_cost: i32,
    /// Sparse: a class without an entry cannot enter the tile.
    pub movement_costs: BTreeMap<MovementClass, i32>,
    pub base_texture: String,
    pub fog_texture: String,
}

impl Terrain {
    pub fn movement_cost(&self, class: MovementClass) -> Option<i32> {
        self.movement_costs.get(&class).copied()
    }
}

impl CatalogEntry for Terrain {
    type Tag = TerrainTag;
    type Raw = RawTerrain;

    const KIND: CatalogKind = CatalogKind::Terrain;

    fn id(&self) -> CatalogId<TerrainTag> {
        self.id
    }

    fn compile(raw: RawTerrain) -> Result<Self, CatalogError> {
        let kind = Self::KIND;
        check_non_negative(kind, raw.id, "base_defence", raw.base_defence)?;
        check_movement_costs(kind, raw.id, &raw.movement_costs)?;
        if raw.sight_cost < 1 {
            return Err(CatalogError::invalid(
                kind,
                raw.id,
                "sight_cost",
                "must be at least 1",
            ));
        }
        let fog_sight_limit = match raw.fog_sight_limit {
            None | Some(-1) => None,
            Some(limit) if limit >= 0 => Some(limit),
            Some(limit) => {
                return Err(CatalogError::invalid(
                    kind,
                    raw.id,
                    "fog_sight_limit",
                    format!("must be -1 or non-negative (got {limit})"),
                ))
            }
        };

        Ok(Self {
            id: TerrainId::new(raw.id),
            name: raw.name,
            base_defence: raw.base_defence,
            sight_distance_increase: raw.sight_distance_increase,
            fog_sight_limit,
            sight_cost: raw.sight_cost,
            movement_costs: raw.movement_costs,
            base_texture: raw.base_texture,
            fog_texture: raw.fog_texture,
        })
    }

    fn to_raw(&self) -> RawTerrain {
        RawTerrain {
            id: self.id.raw,
            name: self.name.clone(),
            base_defence: self.base_defence,
            sight_distance_increase: self.sight_distance_increase,
            fog_sight_limit: self.fog_sight_limit,
            sight_cost: self.sight_cost,
            movement_costs: self.movement_costs.clone(),
            base_texture: self.base_texture.clone(),
            fog_texture: self.fog_texture.clone(),
        }
    }
}

// -----------------------------------------------------------------------------
// Buildings
// -----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawBuilding {
    pub id: u32,
    pub name: String,
    pub base_defence: i32,
    #[serde(default)]
    pub sight_distance: i32,
    #[serde(default = "default_capture_points")]
    pub capture_points: i32,
    #[serde(default)]
    pub income: bool,
    #[serde(default)]
    pub headquarters: bool,
    #[serde(default)]
    pub builds: Vec<MovementClass>,
    #[serde(default)]
    pub repairs: Vec<MovementClass>,
    pub movement_costs: BTreeMap<MovementClass, i32>,
    #[serde(default = "default_sight_cost")]
    pub sight_cost: i32,
    #[serde(default)]
    pub texture: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Building {
    pub id: BuildingId,
    pub name: String,
    pub base_defence: i32,
    pub sight_distance: i32,
    pub capture_points: i32,
    pub income: bool,
    pub headquarters: bool,
    pub builds: Vec<MovementClass>,
    pub repairs: Vec<MovementClass>,
    pub movement_costs: BTreeMap<MovementClass, i32>,
    pub sight_cost: i32,
    pub texture: String,
}

impl Building {
    pub fn movement_cost(&self, class: MovementClass) -> Option<i32> {
        self.movement_costs.get(&class).copied()
    }

    pub fn can_build(&self, class: MovementClass) -> bool {
        self.builds.contains(&class)
    }

    pub fn can_repair(&self, class: MovementClass) -> bool {
        self.repairs.contains(&class)
    }
}

impl CatalogEntry for Building {
    type Tag = BuildingTag;
    type Raw = RawBuilding;

    const KIND: CatalogKind = CatalogKind::Building;

    fn id(&self) -> CatalogId<BuildingTag> {
        self.id
    }

    fn compile(raw: RawBuilding) -> Result<Self, CatalogError> {
        let kind = Self::KIND;
        check_non_negative(kind, raw.id, "base_defence", raw.base_defence)?;
        check_non_negative(kind, raw.id, "sight_distance", raw.sight_distance)?;
        check_movement_costs(kind, raw.id, &raw.movement_costs)?;
        if raw.capture_points < 1 {
            return Err(CatalogError::invalid(
                kind,
                raw.id,
                "capture_points",
                "must be at least 1",
            ));
        }
        if raw.sight_cost < 1 {
            return Err(CatalogError::invalid(
                kind,
                raw.id,
                "sight_cost",
                "must be at least 1",
            ));
        }

        Ok(Self {
            id: BuildingId::new(raw.id),
            name: raw.name,
            base_defence: raw.base_defence,
            sight_distance: raw.sight_distance,
            capture_points: raw.capture_points,
            income: raw.income,
            headquarters: raw.headquarters,
            builds: raw.builds,
            repairs: raw.repairs,
            movement_costs: raw.movement_costs,
            sight_cost: raw.sight_cost,
            texture: raw.texture,
        })
    }

    fn to_raw(&self) -> RawBuilding {
        RawBuilding {
            id: self.id.raw,
            name: self.name.clone(),
            base_defence: self.base_defence,
            sight_distance: self.sight_distance,
            capture_points: self.capture_points,
            income: self.income,
            headquarters: self.headquarters,
            builds: self.builds.clone(),
            repairs: self.repairs.clone(),
            movement_costs: self.movement_costs.clone(),
            sight_cost: self.sight_cost,
            texture: self.texture.clone(),
        }
    }
}

// -----------------------------------------------------------------------------
// Units
// -----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawTransport {
    pub capacity: u32,
    pub classes: Vec<MovementClass>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDamage {
    #[serde(default)]
    pub primary: BTreeMap<u32, i32>,
    #[serde(default)]
    pub secondary: BTreeMap<u32, i32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawUnitType {
    pub id: u32,
    pub name: String,
    pub cost: i32,
    pub movement_points: i32,
    pub movement_class: MovementClass,
    pub vision: i32,
    pub max_fuel: i32,
    #[serde(default)]
    pub daily_fuel: i32,
    #[serde(default)]
    pub hidden_daily_fuel: i32,
    #[serde(default)]
    pub max_ammo: i32,
    #[serde(default = "default_range")]
    pub min_range: i32,
    #[serde(default = "default_range")]
    pub max_range: i32,
    #[serde(default)]
    pub can_capture: bool,
    #[serde(default)]
    pub can_supply: bool,
    #[serde(default)]
    pub can_hide: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<RawTransport>,
    #[serde(default)]
    pub damage: RawDamage,
    #[serde(default)]
    pub texture: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transport {
    pub capacity: u32,
    pub classes: Vec<MovementClass>,
}

/// Base damage tables keyed by defending unit type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DamageTable {
    /// Ammunition-consuming weapon.
    pub primary: BTreeMap<UnitTypeId, i32>,
    pub secondary: BTreeMap<UnitTypeId, i32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnitType {
    pub id: UnitTypeId,
    pub name: String,
    pub cost: i32,
    pub movement_points: i32,
    pub movement_class: MovementClass,
    pub vision: i32,
    pub max_fuel: i32,
    pub daily_fuel: i32,
    pub hidden_daily_fuel: i32,
    pub max_ammo: i32,
    pub min_range: i32,
    pub max_range: i32,
    pub can_capture: bool,
    pub can_supply: bool,
    pub can_hide: bool,
    pub transport: Option<Transport>,
    pub damage: DamageTable,
    pub texture: String,
}

impl UnitType {
    pub fn is_indirect(&self) -> bool {
        self.max_range > 1
    }

    pub fn can_carry(&self, class: MovementClass) -> bool {
        self.transport
            .as_ref()
            .is_some_and(|t| t.classes.contains(&class))
    }

    /// Air and naval units are lost when their fuel runs out.
    pub fn crashes_without_fuel(&self) -> bool {
        self.movement_class.is_air() || self.movement_class.is_naval()
    }
}

impl CatalogEntry for UnitType {
    type Tag = UnitTypeTag;
    type Raw = RawUnitType;

    const KIND: CatalogKind = CatalogKind::Unit;

    fn id(&self) -> CatalogId<UnitTypeTag> {
        self.id
    }

    fn compile(raw: RawUnitType) -> Result<Self, CatalogError> {
        let kind = Self::KIND;
        check_non_negative(kind, raw.id, "cost", raw.cost)?;
        check_non_negative(kind, raw.id, "movement_points", raw.movement_points)?;
        check_non_negative(kind, raw.id, "max_fuel", raw.max_fuel)?;
        check_non_negative(kind, raw.id, "daily_fuel", raw.daily_fuel)?;
        check_non_negative(kind, raw.id, "hidden_daily_fuel", raw.hidden_daily_fuel)?;
        check_non_negative(kind, raw.id, "max_ammo", raw.max_ammo)?;
        if raw.vision < 1 {
            return Err(CatalogError::invalid(
                kind,
                raw.id,
                "vision",
                "must be at least 1",
            ));
        }
        if raw.min_range < 1 || raw.max_range < raw.min_range {
            return Err(CatalogError::invalid(
                kind,
                raw.id,
                "max_range",
                format!("invalid range {}..={}", raw.min_range, raw.max_range),
            ));
        }
        if raw.can_hide && raw.hidden_daily_fuel == 0 && raw.daily_fuel > 0 {
            return Err(CatalogError::invalid(
                kind,
                raw.id,
                "hidden_daily_fuel",
                "must be set for units that can hide and burn fuel",
            ));
        }
        let damage_values = raw.damage.primary.values().chain(raw.damage.secondary.values());
        for value in damage_values {
            check_non_negative(kind, raw.id, "damage", *value)?;
        }

        Ok(Self {
            id: UnitTypeId::new(raw.id),
            name: raw.name,
            cost: raw.cost,
            movement_points: raw.movement_points,
            movement_class: raw.movement_class,
            vision: raw.vision,
            max_fuel: raw.max_fuel,
            daily_fuel: raw.daily_fuel,
            hidden_daily_fuel: raw.hidden_daily_fuel,
            max_ammo: raw.max_ammo,
            min_range: raw.min_range,
            max_range: raw.max_range,
            can_capture: raw.can_capture,
            can_supply: raw.can_supply,
            can_hide: raw.can_hide,
            transport: raw.transport.map(|t| Transport {
                capacity: t.capacity,
                classes: t.classes,
            }),
            damage: DamageTable {
                primary: raw
                    .damage
                    .primary
                    .into_iter()
                    .map(|(id, dmg)| (UnitTypeId::new(id), dmg))
                    .collect(),
                secondary: raw
                    .damage
                    .secondary
                    .into_iter()
                    .map(|(id, dmg)| (UnitTypeId::new(id), dmg))
                    .collect(),
            },
            texture: raw.texture,
        })
    }

    fn to_raw(&self) -> RawUnitType {
        RawUnitType {
            id: self.id.raw,
            name: self.name.clone(),
            cost: self.cost,
            movement_points: self.movement_points,
            movement_class: self.movement_class,
            vision: self.vision,
            max_fuel: self.max_fuel,
            daily_fuel: self.daily_fuel,
            hidden_daily_fuel: self.hidden_daily_fuel,
            max_ammo: self.max_ammo,
            min_range: self.min_range,
            max_range: self.max_range,
            can_capture: self.can_capture,
            can_supply: self.can_supply,
            can_hide: self.can_hide,
            transport: self.transport.as_ref().map(|t| RawTransport {
                capacity: t.capacity,
                classes: t.classes.clone(),
            }),
            damage: RawDamage {
                primary: self
                    .damage
                    .primary
                    .iter()
                    .map(|(id, dmg)| (id.raw, *dmg))
                    .collect(),
                secondary: self
                    .damage
                    .secondary
                    .iter()
                    .map(|(id, dmg)| (id.raw, *dmg))
                    .collect(),
            },
            texture: self.texture.clone(),
        }
    }
}

// -----------------------------------------------------------------------------
// COs
// -----------------------------------------------------------------------------

/// Modifiers a CO grants during one phase (no power, power, super power).
/// Percentages are additive on top of the engine's 100% baseline.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoPhase {
    pub attack: i32,
    pub defence: i32,
    pub direct_attack: i32,
    pub indirect_attack: i32,
    pub vision: i32,
    pub movement: i32,
    pub indirect_range: i32,
    /// Displayed health restored to every own unit on activation.
    pub heal: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<Weather>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawCo {
    pub id: u32,
    pub name: String,
    pub power_stars: i32,
    pub super_stars: i32,
    #[serde(default)]
    pub day: CoPhase,
    #[serde(default)]
    pub power: CoPhase,
    #[serde(default)]
    pub super_power: CoPhase,
    #[serde(default = "default_cost_percent")]
    pub cost_percent: i32,
    #[serde(default = "default_luck_max")]
    pub luck_max: i32,
    #[serde(default)]
    pub bad_luck_max: i32,
    #[serde(default)]
    pub portrait: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Co {
    pub id: CoId,
    pub name: String,
    /// Stars needed for the power; zero means the CO has none.
    pub power_stars: i32,
    pub super_stars: i32,
    pub day: CoPhase,
    pub power: CoPhase,
    pub super_power: CoPhase,
    pub cost_percent: i32,
    pub luck_max: i32,
    pub bad_luck_max: i32,
    pub portrait: String,
}

impl Co {
    pub fn phase(&self, active: Option<PowerKind>) -> &CoPhase {
        match active {
            None => &self.day,
            Some(PowerKind::Power) => &self.power,
            Some(PowerKind::SuperPower) => &self.super_power,
        }
    }

    pub fn stars(&self, power: PowerKind) -> i32 {
        match power {
            PowerKind::Power => self.power_stars,
            PowerKind::SuperPower => self.super_stars,
        }
    }
}

impl CatalogEntry for Co {
    type Tag = CoTag;
    type Raw = RawCo;

    const KIND: CatalogKind = CatalogKind::Co;

    fn id(&self) -> CatalogId<CoTag> {
        self.id
    }

    fn compile(raw: RawCo) -> Result<Self, CatalogError> {
        let kind = Self::KIND;
        check_non_negative(kind, raw.id, "power_stars", raw.power_stars)?;
        check_non_negative(kind, raw.id, "super_stars", raw.super_stars)?;
        check_non_negative(kind, raw.id, "luck_max", raw.luck_max)?;
        check_non_negative(kind, raw.id, "bad_luck_max", raw.bad_luck_max)?;
        if raw.cost_percent < 1 {
            return Err(CatalogError::invalid(
                kind,
                raw.id,
                "cost_percent",
                "must be at least 1",
            ));
        }

        Ok(Self {
            id: CoId::new(raw.id),
            name: raw.name,
            power_stars: raw.power_stars,
            super_stars: raw.super_stars,
            day: raw.day,
            power: raw.power,
            super_power: raw.super_power,
            cost_percent: raw.cost_percent,
            luck_max: raw.luck_max,
            bad_luck_max: raw.bad_luck_max,
            portrait: raw.portrait,
        })
    }

    fn to_raw(&self) -> RawCo {
        RawCo {
            id: self.id.raw,
            name: self.name.clone(),
            power_stars: self.power_stars,
            super_stars: self.super_stars,
            day: self.day.clone(),
            power: self.power.clone(),
            super_power: self.super_power.clone(),
            cost_percent: self.cost_percent,
            luck_max: self.luck_max,
            bad_luck_max: self.bad_luck_max,
            portrait: self.portrait.clone(),
        }
    }
}

// -----------------------------------------------------------------------------
// Countries
// -----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawCountry {
    pub id: u32,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub colour: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Country {
    pub id: CountryId,
    pub name: String,
    pub code: String,
    pub colour: String,
}

impl CatalogEntry for Country {
    type Tag = CountryTag;
    type Raw = RawCountry;

    const KIND: CatalogKind = CatalogKind::Country;

    fn id(&self) -> CatalogId<CountryTag> {
        self.id
    }

    fn compile(raw: RawCountry) -> Result<Self, CatalogError> {
        if raw.code.is_empty() {
            return Err(CatalogError::invalid(
                Self::KIND,
                raw.id,
                "code",
                "must not be empty",
            ));
        }
        Ok(Self {
            id: CountryId::new(raw.id),
            name: raw.name,
            code: raw.code,
            colour: raw.colour,
        })
    }

    fn to_raw(&self) -> RawCountry {
        RawCountry {
            id: self.id.raw,
            name: self.name.clone(),
            code: self.code.clone(),
            colour: self.colour.clone(),
        }
    }
}
