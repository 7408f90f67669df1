//! Autotile configuration: tile definitions, bitmask sets and tile ids.

use crate::bitmask::Bitmask;
use crate::error::{AutotileError, ConfigError};
use crate::spatial::{GridCoord, LayerIdx, TileId};
use crate::terrain::TerrainDefinition;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Group value of tiles that never autotile and always draw `position_in_set`.
pub const FIXED_TILE_GROUP: i32 = -1;

/// One logical tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileDefinition {
    /// Render layer the tile is drawn on.
    pub layer: LayerIdx,
    /// Image name relative to the image directory, without extension.
    pub image_file_name: String,
    /// Bitmask set used when autotiled.
    pub bitmask_name: String,
    /// Top-left tile of this definition's block inside its image.
    pub position_in_set: GridCoord,
    /// Tiles of one group connect; [`FIXED_TILE_GROUP`] never autotiles.
    pub auto_tile_group: i32,
}

impl TileDefinition {
    /// False for [`FIXED_TILE_GROUP`].
    #[inline]
    pub fn is_autotiled(&self) -> bool {
        self.auto_tile_group != FIXED_TILE_GROUP
    }
}

/// Image-local tile offset to the neighbor pattern it depicts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitmaskSet {
    entries: BTreeMap<GridCoord, Bitmask>,
}

impl BitmaskSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `offset` to `mask`, returning the previous mask.
    pub fn insert(&mut self, offset: GridCoord, mask: Bitmask) -> Option<Bitmask> {
        self.entries.insert(offset, mask)
    }

    /// Mask stored for `offset`.
    pub fn get(&self, offset: GridCoord) -> Option<Bitmask> {
        self.entries.get(&offset).copied()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by offset.
    pub fn iter(&self) -> impl Iterator<Item = (GridCoord, Bitmask)> + '_ {
        self.entries.iter().map(|(c, m)| (*c, *m))
    }

    /// Inverse table, mask to offset. When several offsets share a mask the
    /// smallest offset wins.
    pub fn by_mask(&self) -> HashMap<Bitmask, GridCoord> {
        let mut out = HashMap::with_capacity(self.entries.len());
        for (offset, mask) in self.iter() {
            out.entry(mask).or_insert(offset);
        }
        out
    }
}

impl FromIterator<(GridCoord, Bitmask)> for BitmaskSet {
    fn from_iter<I: IntoIterator<Item = (GridCoord, Bitmask)>>(iter: I) -> Self {
        BitmaskSet {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Immutable registry of tile definitions and bitmask tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoTileConfig {
    tile_size: u32,
    tile_definitions: Vec<(String, TileDefinition)>,
    bitmask_sets: BTreeMap<String, BitmaskSet>,
}

impl AutoTileConfig {
    /// Validate and build a config. Definition order is kept; it drives the
    /// default tile id assignment.
    pub fn new(
        tile_size: i64,
        tile_definitions: Vec<(String, TileDefinition)>,
        bitmask_sets: BTreeMap<String, BitmaskSet>,
    ) -> Result<Self, ConfigError> {
        let tile_size = u32::try_from(tile_size)
            .ok()
            .filter(|s| *s > 0)
            .ok_or(ConfigError::NonPositiveTileSize(tile_size))?;

        for (name, def) in &tile_definitions {
            if def.is_autotiled() && !bitmask_sets.contains_key(&def.bitmask_name) {
                return Err(ConfigError::MissingBitmaskSet {
                    tile: name.clone(),
                    bitmask: def.bitmask_name.clone(),
                });
            }
        }

        Ok(Self {
            tile_size,
            tile_definitions,
            bitmask_sets,
        })
    }

    /// Read a JSON config document from disk.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, AutotileError> {
        crate::loader::json_config::decode_config_file(path.as_ref())
    }

    /// Parse and validate a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, AutotileError> {
        crate::loader::json_config::decode_config_str(json)
    }

    /// Pretty JSON in the same format `from_json_str` reads.
    pub fn to_json_string(&self) -> String {
        crate::loader::json_config::encode_config(self)
    }

    /// Write [`to_json_string`](Self::to_json_string) to `path`.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), AutotileError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json_string()).map_err(|source| AutotileError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Tile edge in pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Definitions in insertion order.
    pub fn tile_definitions(&self) -> impl Iterator<Item = (&str, &TileDefinition)> {
        self.tile_definitions
            .iter()
            .map(|(name, def)| (name.as_str(), def))
    }

    /// Definition of the tile called `name`.
    pub fn tile_definition(&self, name: &str) -> Option<&TileDefinition> {
        self.tile_definitions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, def)| def)
    }

    /// Sets ordered by name.
    pub fn bitmask_sets(&self) -> impl Iterator<Item = (&str, &BitmaskSet)> {
        self.bitmask_sets.iter().map(|(n, s)| (n.as_str(), s))
    }

    /// Bitmask set called `name`.
    pub fn bitmask_set(&self, name: &str) -> Option<&BitmaskSet> {
        self.bitmask_sets.get(name)
    }

    /// `max(layer) + 1`, or 1 for a config without tiles.
    pub fn layer_count(&self) -> usize {
        self.tile_definitions
            .iter()
            .map(|(_, def)| def.layer + 1)
            .max()
            .unwrap_or(1)
    }

    /// Ids assigned by definition order: first definition is 0.
    pub fn tile_ids(&self) -> TileIdMap {
        TileIdMap::from_config(self)
    }
}

/// Association between tile names and their numeric ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileIdMap {
    ids: BTreeMap<String, TileId>,
    names: BTreeMap<TileId, String>,
}

impl TileIdMap {
    /// Ids by definition order, starting at 0.
    pub fn from_config(config: &AutoTileConfig) -> Self {
        let mut map = TileIdMap::default();
        for (i, (name, _)) in config.tile_definitions().enumerate() {
            map.ids.insert(name.to_owned(), TileId(i as u32));
            map.names.insert(TileId(i as u32), name.to_owned());
        }
        map
    }

    /// Caller-chosen ids. Every defined tile must get exactly one unique id.
    pub fn custom<I, S>(config: &AutoTileConfig, pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (S, TileId)>,
        S: Into<String>,
    {
        let mut map = TileIdMap::default();
        for (name, id) in pairs {
            let name = name.into();
            if config.tile_definition(&name).is_none() {
                return Err(ConfigError::UnknownTileName(name));
            }
            if let Some(first) = map.names.get(&id) {
                if *first != name {
                    return Err(ConfigError::DuplicateTileId {
                        id,
                        first: first.clone(),
                        second: name,
                    });
                }
            }
            if let Some(old) = map.ids.insert(name.clone(), id) {
                map.names.remove(&old);
            }
            map.names.insert(id, name);
        }

        if let Some((missing, _)) = config
            .tile_definitions()
            .find(|(name, _)| !map.ids.contains_key(*name))
        {
            return Err(ConfigError::MissingTileId(missing.to_owned()));
        }
        Ok(map)
    }

    /// Id of the tile called `name`.
    pub fn get(&self, name: &str) -> Option<TileId> {
        self.ids.get(name).copied()
    }

    /// Reverse lookup.
    pub fn name_of(&self, id: TileId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Number of mapped names.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no name is mapped.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Pairs ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = (TileId, &str)> {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }
}

/// Builds an [`AutoTileConfig`] in code.
#[derive(Debug, Default)]
pub struct AutoTileConfigBuilder {
    tile_size: i64,
    tile_definitions: Vec<(String, TileDefinition)>,
    bitmask_sets: BTreeMap<String, BitmaskSet>,
}

impl AutoTileConfigBuilder {
    /// Builder with the default tile size and nothing defined.
    pub fn new() -> Self {
        Self::default()
    }

    /// Checked by [`build`](Self::build).
    pub fn tile_size(mut self, tile_size: i64) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Redefining a name replaces the definition but keeps its original slot.
    pub fn tile_definition(mut self, name: impl Into<String>, def: TileDefinition) -> Self {
        let name = name.into();
        match self.tile_definitions.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = def,
            None => self.tile_definitions.push((name, def)),
        }
        self
    }

    /// Add or replace the set called `name`.
    pub fn bitmask_set(mut self, name: impl Into<String>, set: BitmaskSet) -> Self {
        self.bitmask_sets.insert(name.into(), set);
        self
    }

    /// Adds the table converted from one terrain of a terrain definition.
    pub fn bitmask_set_from_terrain(
        self,
        name: impl Into<String>,
        terrain: &TerrainDefinition,
        terrain_set: i32,
        terrain_id: i32,
    ) -> Self {
        let set = terrain.bitmask_set(terrain_set, terrain_id);
        self.bitmask_set(name, set)
    }

    /// Validate and produce the config.
    pub fn build(self) -> Result<AutoTileConfig, ConfigError> {
        AutoTileConfig::new(self.tile_size, self.tile_definitions, self.bitmask_sets)
    }
}
