use std::collections::BTreeMap;
use std::fmt;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use warroom_protocol::{BuildingId, CatalogId, CoId, CountryId, TerrainId, UnitTypeId};

use crate::rules::{Building, Co, Country, Terrain, UnitType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    Terrain,
    Building,
    Unit,
    Co,
    Country,
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CatalogKind::Terrain => "terrain",
            CatalogKind::Building => "building",
            CatalogKind::Unit => "unit",
            CatalogKind::Co => "CO",
            CatalogKind::Country => "country",
        };
        f.write_str(name)
    }
}

/// Lookup of an id that no loaded catalog defines.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} id {id}")]
pub struct UnknownCatalogId {
    pub kind: CatalogKind,
    pub id: u32,
}

/// Catalog load failure. Loading is all-or-nothing: no partial catalog is
/// ever returned alongside one of these.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{kind} {id}: field `{field}` {reason}")]
    Invalid {
        kind: CatalogKind,
        id: u32,
        field: &'static str,
        reason: String,
    },
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: CatalogKind, id: u32 },
    #[error("{kind} {id} references {missing}")]
    MissingReference {
        kind: CatalogKind,
        id: u32,
        missing: UnknownCatalogId,
    },
}

impl CatalogError {
    pub(crate) fn invalid(
        kind: CatalogKind,
        id: u32,
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        CatalogError::Invalid {
            kind,
            id,
            field,
            reason: reason.into(),
        }
    }
}

/// A record type stored in a [`Catalog`]: decoded from its raw definition form
/// and re-encodable to it without loss.
pub trait CatalogEntry: Sized {
    type Tag;
    type Raw: DeserializeOwned + Serialize;

    const KIND: CatalogKind;

    fn id(&self) -> CatalogId<Self::Tag>;

    fn compile(raw: Self::Raw) -> Result<Self, CatalogError>;

    fn to_raw(&self) -> Self::Raw;
}

/// Immutable, id-keyed reference data. Iteration is in ascending id order.
#[derive(Clone, Debug)]
pub struct Catalog<T> {
    entries: BTreeMap<u32, T>,
}

impl<T: CatalogEntry> Catalog<T> {
    pub fn from_raw(raw: Vec<T::Raw>) -> Result<Self, CatalogError> {
        let mut entries = BTreeMap::new();
        for record in raw {
            let entry = T::compile(record)?;
            let id = entry.id().raw;
            if entries.insert(id, entry).is_some() {
                return Err(CatalogError::DuplicateId { kind: T::KIND, id });
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, id: CatalogId<T::Tag>) -> Result<&T, UnknownCatalogId> {
        self.entries.get(&id.raw).ok_or(UnknownCatalogId {
            kind: T::KIND,
            id: id.raw,
        })
    }

    pub fn contains(&self, id: CatalogId<T::Tag>) -> bool {
        self.entries.contains_key(&id.raw)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-encode the catalog into its definition form.
    pub fn to_raw(&self) -> Vec<T::Raw> {
        self.entries.values().map(CatalogEntry::to_raw).collect()
    }

    pub fn to_json(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(&self.to_raw())?)
    }
}

/// The loaded rule catalogs, shared read-only by every simulated state.
#[derive(Clone, Debug)]
pub struct Ruleset {
    pub terrains: Catalog<Terrain>,
    pub buildings: Catalog<Building>,
    pub units: Catalog<UnitType>,
    pub cos: Catalog<Co>,
    pub countries: Catalog<Country>,
}

impl Ruleset {
    /// Bundle catalogs, validating the references between them.
    pub fn new(
        terrains: Catalog<Terrain>,
        buildings: Catalog<Building>,
        units: Catalog<UnitType>,
        cos: Catalog<Co>,
        countries: Catalog<Country>,
    ) -> Result<Self, CatalogError> {
        for unit in units.iter() {
            let targets = unit
                .damage
                .primary
                .keys()
                .chain(unit.damage.secondary.keys());
            for target in targets {
                if !units.contains(*target) {
                    return Err(CatalogError::MissingReference {
                        kind: CatalogKind::Unit,
                        id: unit.id.raw,
                        missing: UnknownCatalogId {
                            kind: CatalogKind::Unit,
                            id: target.raw,
                        },
                    });
                }
            }
        }

        Ok(Self {
            terrains,
            buildings,
            units,
            cos,
            countries,
        })
    }

    pub fn terrain(&self, id: TerrainId) -> Result<&Terrain, UnknownCatalogId> {
        self.terrains.get(id)
    }

    pub fn building(&self, id: BuildingId) -> Result<&Building, UnknownCatalogId> {
        self.buildings.get(id)
    }

    pub fn unit_type(&self, id: UnitTypeId) -> Result<&UnitType, UnknownCatalogId> {
        self.units.get(id)
    }

    pub fn co(&self, id: CoId) -> Result<&Co, UnknownCatalogId> {
        self.cos.get(id)
    }

    pub fn country(&self, id: CountryId) -> Result<&Country, UnknownCatalogId> {
        self.countries.get(id)
    }
}
