//! Converts externally edited terrain definitions into bitmask tables.
//!
//! A terrain definition lists the tiles of one image together with their
//! terrain membership and the terrain each side/corner "peers" with. A
//! peering value of `-1` means the side does not connect.

use crate::bitmask::{Bitmask, Direction};
use crate::config::BitmaskSet;
use crate::error::{AutotileError, ConfigError};
use crate::spatial::GridCoord;
use serde::Deserialize;
use std::path::Path;

/// Peering value of a side that does not connect.
pub const NO_PEERING: i32 = -1;

/// Terrain each side and corner connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peering {
    /// Up-left corner.
    #[serde(default = "no_peering")]
    pub top_left: i32,
    /// Upper side.
    #[serde(default = "no_peering")]
    pub top: i32,
    /// Up-right corner.
    #[serde(default = "no_peering")]
    pub top_right: i32,
    /// Right side.
    #[serde(default = "no_peering")]
    pub right: i32,
    /// Down-right corner.
    #[serde(default = "no_peering")]
    pub bottom_right: i32,
    /// Lower side.
    #[serde(default = "no_peering")]
    pub bottom: i32,
    /// Down-left corner.
    #[serde(default = "no_peering")]
    pub bottom_left: i32,
    /// Left side.
    #[serde(default = "no_peering")]
    pub left: i32,
}

fn no_peering() -> i32 {
    NO_PEERING
}

impl Default for Peering {
    fn default() -> Self {
        Peering {
            top_left: NO_PEERING,
            top: NO_PEERING,
            top_right: NO_PEERING,
            right: NO_PEERING,
            bottom_right: NO_PEERING,
            bottom: NO_PEERING,
            bottom_left: NO_PEERING,
            left: NO_PEERING,
        }
    }
}

impl Peering {
    /// Peering value toward `direction`.
    pub fn get(&self, direction: Direction) -> i32 {
        match direction {
            Direction::TopLeft => self.top_left,
            Direction::Top => self.top,
            Direction::TopRight => self.top_right,
            Direction::Right => self.right,
            Direction::BottomRight => self.bottom_right,
            Direction::Bottom => self.bottom,
            Direction::BottomLeft => self.bottom_left,
            Direction::Left => self.left,
        }
    }

    /// Bit set for every side that connects.
    pub fn bitmask(&self) -> Bitmask {
        Bitmask::from_fn(|d| self.get(d) > NO_PEERING)
    }
}

/// Atlas position in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TerrainCoord {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

/// One annotated tile of the image.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainTile {
    /// Where the tile sits in the image.
    pub atlas_coords: TerrainCoord,
    /// Terrain set the tile belongs to.
    pub terrain_set: i32,
    /// Terrain inside the set.
    pub terrain: i32,
    /// Connections to the 8 neighbors.
    #[serde(default)]
    pub peering: Peering,
}

/// The tiles of one terrain-annotated image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TerrainDefinition {
    /// Annotated tiles, in file order.
    pub tiles: Vec<TerrainTile>,
}

impl TerrainDefinition {
    /// Parse a terrain document held in memory.
    pub fn from_json_str(json: &str) -> Result<Self, AutotileError> {
        serde_json::from_str(json).map_err(|source| AutotileError::Json {
            path: Path::new("<inline>").to_path_buf(),
            source,
        })
    }

    /// Read a terrain file; one without tiles is an error.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, AutotileError> {
        let path = path.as_ref();
        let txt = std::fs::read_to_string(path).map_err(|source| AutotileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let def: TerrainDefinition =
            serde_json::from_str(&txt).map_err(|source| AutotileError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        if def.tiles.is_empty() {
            return Err(ConfigError::Terrain(format!("{} has no tiles", path.display())).into());
        }
        Ok(def)
    }

    /// Table of every tile belonging to `(terrain_set, terrain)`. Later tiles
    /// at the same coordinate replace earlier ones.
    pub fn bitmask_set(&self, terrain_set: i32, terrain: i32) -> BitmaskSet {
        let mut set = BitmaskSet::new();
        for tile in &self.tiles {
            if tile.terrain_set == terrain_set && tile.terrain == terrain {
                let coord = GridCoord::new(tile.atlas_coords.x, tile.atlas_coords.y);
                set.insert(coord, tile.peering.bitmask());
            }
        }
        set
    }
}
