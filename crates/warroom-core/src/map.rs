use serde::{Deserialize, Serialize};
use warroom_protocol::{
    BuildingId, BuildingSnapshot, MapSnapshot, MovementClass, PlayerId, Position, TerrainId,
    TileSnapshot,
};

use crate::rules::{Ruleset, UnknownCatalogId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingOnTile {
    pub id: BuildingId,
    pub owner: Option<PlayerId>,
    /// Remaining capture points.
    pub capture: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub terrain: TerrainId,
    pub building: Option<BuildingOnTile>,
}

impl Tile {
    /// Movement cost of entering this tile, `None` when impassable for `class`.
    /// A building's costs replace the terrain's.
    pub fn movement_cost(
        &self,
        rules: &Ruleset,
        class: MovementClass,
    ) -> Result<Option<i32>, UnknownCatalogId> {
        match &self.building {
            Some(b) => Ok(rules.building(b.id)?.movement_cost(class)),
            None => Ok(rules.terrain(self.terrain)?.movement_cost(class)),
        }
    }

    /// Defence stars granted to a unit standing here.
    pub fn defence(&self, rules: &Ruleset) -> Result<i32, UnknownCatalogId> {
        match &self.building {
            Some(b) => Ok(rules.building(b.id)?.base_defence),
            None => Ok(rules.terrain(self.terrain)?.base_defence),
        }
    }

    pub fn sight_cost(&self, rules: &Ruleset) -> Result<i32, UnknownCatalogId> {
        match &self.building {
            Some(b) => Ok(rules.building(b.id)?.sight_cost),
            None => Ok(rules.terrain(self.terrain)?.sight_cost),
        }
    }

    pub fn owner(&self) -> Option<PlayerId> {
        self.building.as_ref().and_then(|b| b.owner)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameMap {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

impl GameMap {
    pub fn new(width: u32, height: u32, default_terrain: TerrainId) -> Self {
        let tiles = vec![
            Tile {
                terrain: default_terrain,
                building: None,
            };
            (width as usize) * (height as usize)
        ];
        Self {
            width,
            height,
            tiles,
        }
    }

    /// Build a map from its snapshot form. Buildings without recorded capture
    /// progress start at their catalog capture points.
    pub fn from_snapshot(rules: &Ruleset, snapshot: &MapSnapshot) -> Result<Self, String> {
        let expected = (snapshot.width as usize) * (snapshot.height as usize);
        if snapshot.tiles.len() != expected {
            return Err(format!(
                "map is {}x{} but has {} tiles",
                snapshot.width,
                snapshot.height,
                snapshot.tiles.len()
            ));
        }

        let mut tiles = Vec::with_capacity(expected);
        for snap in &snapshot.tiles {
            rules.terrain(snap.terrain).map_err(|e| e.to_string())?;
            let building = match &snap.building {
                Some(b) => {
                    let def = rules.building(b.id).map_err(|e| e.to_string())?;
                    Some(BuildingOnTile {
                        id: b.id,
                        owner: b.owner,
                        capture: b.capture.unwrap_or(def.capture_points),
                    })
                }
                None => None,
            };
            tiles.push(Tile {
                terrain: snap.terrain,
                building,
            });
        }

        Ok(Self {
            width: snapshot.width,
            height: snapshot.height,
            tiles,
        })
    }

    pub fn to_snapshot(&self) -> MapSnapshot {
        MapSnapshot {
            width: self.width,
            height: self.height,
            tiles: self
                .tiles
                .iter()
                .map(|tile| TileSnapshot {
                    terrain: tile.terrain,
                    building: tile.building.as_ref().map(|b| BuildingSnapshot {
                        id: b.id,
                        owner: b.owner,
                        capture: Some(b.capture),
                    }),
                })
                .collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.index_of(pos).is_some()
    }

    pub fn index_of(&self, pos: Position) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width as i32 || pos.y >= self.height as i32 {
            return None;
        }
        Some((pos.y as usize) * (self.width as usize) + (pos.x as usize))
    }

    pub fn position_at(&self, index: usize) -> Option<Position> {
        if index >= self.tiles.len() {
            return None;
        }
        let x = (index % self.width as usize) as i32;
        let y = (index / self.width as usize) as i32;
        Some(Position::new(x, y))
    }

    pub fn neighbors_indices(&self, index: usize) -> [Option<usize>; 4] {
        let Some(pos) = self.position_at(index) else {
            return [None; 4];
        };
        let mut out = [None; 4];
        for (i, dir) in Position::DIRECTIONS.into_iter().enumerate() {
            out[i] = self.index_of(pos + dir);
        }
        out
    }

    pub fn get(&self, pos: Position) -> Option<&Tile> {
        self.index_of(pos).map(|i| &self.tiles[i])
    }

    pub fn get_mut(&mut self, pos: Position) -> Option<&mut Tile> {
        self.index_of(pos).map(move |i| &mut self.tiles[i])
    }

    pub fn tile_at_index(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    /// Positions of every building, in row-major order.
    pub fn buildings(&self) -> impl Iterator<Item = (Position, &BuildingOnTile)> + '_ {
        self.tiles.iter().enumerate().filter_map(move |(i, tile)| {
            let pos = self.position_at(i)?;
            tile.building.as_ref().map(|b| (pos, b))
        })
    }

    pub fn buildings_mut(&mut self) -> impl Iterator<Item = &mut BuildingOnTile> + '_ {
        self.tiles.iter_mut().filter_map(|tile| tile.building.as_mut())
    }
}
