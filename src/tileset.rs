//! Per-tile image resources derived from a config.

use crate::bitmask::Bitmask;
use crate::config::{AutoTileConfig, TileDefinition, TileIdMap};
use crate::error::ConfigError;
use crate::loader::json_config::image_path;
use crate::spatial::{GridCoord, LayerIdx, TileId};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Extension appended to `image_file_name` when locating images.
pub const DEFAULT_IMAGE_EXTENSION: &str = "png";

/// A tile definition bound to its image file and atlas coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileResource {
    /// Resolved image file.
    pub image_path: PathBuf,
    /// Layer the tile draws on.
    pub layer: LayerIdx,
    /// Atlas coordinates (inside the image) to the mask each one depicts.
    pub bitmask_map: BTreeMap<GridCoord, Bitmask>,
}

impl TileResource {
    /// Bind `def` to its image under `image_dir`.
    pub fn from_def(
        def: &TileDefinition,
        config: &AutoTileConfig,
        image_dir: &Path,
        extension: &str,
    ) -> Self {
        let mut bitmask_map: BTreeMap<GridCoord, Bitmask> = config
            .bitmask_set(&def.bitmask_name)
            .map(|set| {
                set.iter()
                    .map(|(offset, mask)| (def.position_in_set + offset, mask))
                    .collect()
            })
            .unwrap_or_default();
        if !def.is_autotiled() {
            bitmask_map
                .entry(def.position_in_set)
                .or_insert(Bitmask::DEFAULT);
        }

        TileResource {
            image_path: image_path(image_dir, &def.image_file_name, extension),
            layer: def.layer,
            bitmask_map,
        }
    }
}

/// Resolve every definition of `config` to a resource, keyed by its id.
pub fn load_tile_resources(
    config: &AutoTileConfig,
    tile_ids: &TileIdMap,
    image_dir: &Path,
    extension: &str,
) -> Result<BTreeMap<TileId, TileResource>, ConfigError> {
    let mut tiles = BTreeMap::new();
    for (name, def) in config.tile_definitions() {
        let id = tile_ids
            .get(name)
            .ok_or_else(|| ConfigError::MissingTileId(name.to_owned()))?;
        tiles.insert(id, TileResource::from_def(def, config, image_dir, extension));
    }
    Ok(tiles)
}
