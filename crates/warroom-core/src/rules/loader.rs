use std::io::Read;
use std::path::PathBuf;

use crate::rules::{
    Building, Catalog, CatalogEntry, CatalogError, Co, Country, Ruleset, Terrain, UnitType,
};

pub enum RulesSource<'a> {
    /// The base catalogs compiled into the crate.
    Embedded,
    /// A directory holding `terrain.json`, `buildings.json`, `units.json`,
    /// `cos.json` and `countries.json`.
    Path(PathBuf),
    Bytes {
        terrain: &'a [u8],
        buildings: &'a [u8],
        units: &'a [u8],
        cos: &'a [u8],
        countries: &'a [u8],
    },
}

/// Build one catalog from a JSON array of definitions.
pub fn load_catalog<T: CatalogEntry>(reader: impl Read) -> Result<Catalog<T>, CatalogError> {
    let raw: Vec<T::Raw> = serde_json::from_reader(reader)?;
    Catalog::from_raw(raw)
}

pub fn parse_catalog<T: CatalogEntry>(json: &[u8]) -> Result<Catalog<T>, CatalogError> {
    let raw: Vec<T::Raw> = serde_json::from_slice(json)?;
    Catalog::from_raw(raw)
}

pub fn load_ruleset(source: RulesSource<'_>) -> Result<Ruleset, CatalogError> {
    let ruleset = match source {
        RulesSource::Embedded => parse_ruleset(
            include_str!("../../data/base/terrain.json").as_bytes(),
            include_str!("../../data/base/buildings.json").as_bytes(),
            include_str!("../../data/base/units.json").as_bytes(),
            include_str!("../../data/base/cos.json").as_bytes(),
            include_str!("../../data/base/countries.json").as_bytes(),
        )?,
        RulesSource::Path(dir) => {
            let terrain = std::fs::read(dir.join("terrain.json"))?;
            let buildings = std::fs::read(dir.join("buildings.json"))?;
            let units = std::fs::read(dir.join("units.json"))?;
            let cos = std::fs::read(dir.join("cos.json"))?;
            let countries = std::fs::read(dir.join("countries.json"))?;
            parse_ruleset(&terrain, &buildings, &units, &cos, &countries)?
        }
        RulesSource::Bytes {
            terrain,
            buildings,
            units,
            cos,
            countries,
        } => parse_ruleset(terrain, buildings, units, cos, countries)?,
    };

    tracing::info!(
        terrains = ruleset.terrains.len(),
        buildings = ruleset.buildings.len(),
        units = ruleset.units.len(),
        cos = ruleset.cos.len(),
        countries = ruleset.countries.len(),
        "Loaded rule catalogs"
    );
    Ok(ruleset)
}

fn parse_ruleset(
    terrain: &[u8],
    buildings: &[u8],
    units: &[u8],
    cos: &[u8],
    countries: &[u8],
) -> Result<Ruleset, CatalogError> {
    Ruleset::new(
        parse_catalog::<Terrain>(terrain)?,
        parse_catalog::<Building>(buildings)?,
        parse_catalog::<UnitType>(units)?,
        parse_catalog::<Co>(cos)?,
        parse_catalog::<Country>(countries)?,
    )
}
