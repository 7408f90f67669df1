//! Atlas packing: one source per distinct image, tile ids bound to sources.

use crate::error::{AutotileError, ConfigError};
use crate::spatial::{GridCoord, TileId};
use crate::surface::{RenderSurface, SourceId};
use crate::tileset::TileResource;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Decoded RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA8 pixels.
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// Fully transparent image.
    pub fn blank(width: u32, height: u32) -> Self {
        ImageData {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Whether the `tile_size` square at tile coordinate `coord` fits inside.
    pub fn contains_tile(&self, coord: GridCoord, tile_size: u32) -> bool {
        let (Ok(x), Ok(y)) = (u64::try_from(coord.x), u64::try_from(coord.y)) else {
            return false;
        };
        let ts = u64::from(tile_size);
        (x + 1) * ts <= u64::from(self.width) && (y + 1) * ts <= u64::from(self.height)
    }
}

/// Loads images by path.
pub trait ImageProvider {
    /// Decode the image at `path`.
    fn load(&self, path: &Path) -> Result<ImageData, AutotileError>;
}

/// One packed image registered as a drawing source.
#[derive(Debug, Clone)]
pub struct AtlasSource {
    /// Surface handle. Provisional (the source index) until installed.
    pub id: SourceId,
    /// Image file the source was loaded from.
    pub image_path: PathBuf,
    /// Decoded pixels.
    pub image: Arc<ImageData>,
    /// Local tile coordinates that are drawn from this image.
    pub tiles: BTreeSet<GridCoord>,
}

/// Result of packing: sources and the tile id to source binding.
#[derive(Debug, Clone)]
pub struct AtlasLayout {
    tile_size: u32,
    layer_count: usize,
    sources: Vec<AtlasSource>,
    tile_sources: HashMap<TileId, usize>,
    installed: bool,
}

impl AtlasLayout {
    /// Tile edge in pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// `max(layer) + 1` over the packed tiles, 1 when empty.
    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    /// Sources in packing order.
    pub fn sources(&self) -> &[AtlasSource] {
        &self.sources
    }

    /// Whether [`install`](Self::install) has run.
    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Source handle drawing `tile`.
    pub fn source_of(&self, tile: TileId) -> Option<SourceId> {
        self.tile_sources.get(&tile).map(|&i| self.sources[i].id)
    }

    /// Tile id to surface handle, for the resolver workers.
    pub fn source_table(&self) -> HashMap<TileId, SourceId> {
        self.tile_sources
            .iter()
            .map(|(&tile, &i)| (tile, self.sources[i].id))
            .collect()
    }

    /// Create every source and tile on `surface` and adopt the handles it
    /// returns. Must run on the surface-writer context.
    pub fn install<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
    ) -> Result<(), AutotileError> {
        for source in &mut self.sources {
            let id = surface
                .create_source(&source.image, self.tile_size)
                .map_err(|reason| AutotileError::ImageLoad {
                    path: source.image_path.clone(),
                    reason,
                })?;
            for &local in &source.tiles {
                surface.register_tile(id, local);
            }
            log::debug!(
                "Installed atlas source {} as {:?} ({} tiles)",
                source.image_path.display(),
                id,
                source.tiles.len()
            );
            source.id = id;
        }
        self.installed = true;
        Ok(())
    }
}

/// Builds an [`AtlasLayout`] from tile resources.
pub struct AtlasPacker;

impl AtlasPacker {
    /// Group tiles by image, load each image once through `provider`, and
    /// register the union of the group's atlas coordinates on its source.
    pub fn pack<P: ImageProvider + ?Sized>(
        tiles: &BTreeMap<TileId, TileResource>,
        tile_size: u32,
        provider: &P,
    ) -> Result<AtlasLayout, AutotileError> {
        if tile_size == 0 {
            return Err(ConfigError::NonPositiveTileSize(0).into());
        }

        // Groups in order of first appearance by ascending tile id.
        let mut groups: Vec<(&Path, Vec<TileId>)> = Vec::new();
        let mut group_of_path: HashMap<&Path, usize> = HashMap::new();
        for (&tile, res) in tiles {
            let idx = *group_of_path
                .entry(res.image_path.as_path())
                .or_insert_with(|| {
                    groups.push((res.image_path.as_path(), Vec::new()));
                    groups.len() - 1
                });
            groups[idx].1.push(tile);
        }

        let mut sources = Vec::with_capacity(groups.len());
        let mut tile_sources = HashMap::with_capacity(tiles.len());
        for (index, (path, ids)) in groups.into_iter().enumerate() {
            let image = provider.load(path)?;

            let mut local_tiles = BTreeSet::new();
            for tile in &ids {
                local_tiles.extend(tiles[tile].bitmask_map.keys().copied());
                tile_sources.insert(*tile, index);
            }
            if let Some(&outside) = local_tiles
                .iter()
                .find(|c| !image.contains_tile(**c, tile_size))
            {
                return Err(ConfigError::TileOutsideImage {
                    path: path.to_path_buf(),
                    coord: outside,
                    width: image.width,
                    height: image.height,
                }
                .into());
            }

            sources.push(AtlasSource {
                id: SourceId(index as u32),
                image_path: path.to_path_buf(),
                image: Arc::new(image),
                tiles: local_tiles,
            });
        }

        let layer_count = tiles.values().map(|t| t.layer + 1).max().unwrap_or(1);
        log::info!(
            "Packed {} tiles into {} atlas sources ({} layers, {}px tiles)",
            tiles.len(),
            sources.len(),
            layer_count,
            tile_size
        );

        Ok(AtlasLayout {
            tile_size,
            layer_count,
            sources,
            tile_sources,
            installed: false,
        })
    }
}
