//! Turns logical placements into atlas tiles by inspecting the 8 neighbors.
//!
//! Neighbor presence is computed from the placements of the batch being
//! resolved, never from what is already on the surface.

use crate::bitmask::{Bitmask, Direction};
use crate::config::{AutoTileConfig, TileIdMap};
use crate::error::{ConfigError, ResolutionError};
use crate::spatial::{GridCoord, TileId};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Batches at least this large are resolved in parallel.
const PARALLEL_THRESHOLD: usize = 4096;

/// A resolved cell: which logical tile, drawn from which atlas tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileData {
    /// Logical tile.
    pub tile_id: TileId,
    /// Tile inside the source image.
    pub atlas_coords: GridCoord,
}

#[derive(Debug)]
struct ResolverEntry {
    name: String,
    /// `None` for fixed tiles.
    group: Option<i32>,
    position_in_set: GridCoord,
    /// Mask to atlas coordinates, shared by tiles using the same table at
    /// the same position.
    variants: Arc<HashMap<Bitmask, GridCoord>>,
}

/// Read-only resolution tables derived from a config and its tile ids.
#[derive(Debug)]
pub struct TileResolver {
    entries: HashMap<TileId, ResolverEntry>,
}

impl TileResolver {
    /// Build the tables; every defined tile needs an id.
    pub fn new(config: &AutoTileConfig, tile_ids: &TileIdMap) -> Result<Self, ConfigError> {
        let mut shared: HashMap<(&str, GridCoord), Arc<HashMap<Bitmask, GridCoord>>> =
            HashMap::new();
        let mut entries = HashMap::with_capacity(tile_ids.len());

        for (name, def) in config.tile_definitions() {
            let id = tile_ids
                .get(name)
                .ok_or_else(|| ConfigError::MissingTileId(name.to_owned()))?;

            let variants = if def.is_autotiled() {
                let set = config.bitmask_set(&def.bitmask_name).ok_or_else(|| {
                    ConfigError::MissingBitmaskSet {
                        tile: name.to_owned(),
                        bitmask: def.bitmask_name.clone(),
                    }
                })?;
                shared
                    .entry((def.bitmask_name.as_str(), def.position_in_set))
                    .or_insert_with(|| {
                        Arc::new(
                            set.by_mask()
                                .into_iter()
                                .map(|(mask, offset)| (mask, def.position_in_set + offset))
                                .collect(),
                        )
                    })
                    .clone()
            } else {
                Arc::default()
            };

            entries.insert(
                id,
                ResolverEntry {
                    name: name.to_owned(),
                    group: def.is_autotiled().then_some(def.auto_tile_group),
                    position_in_set: def.position_in_set,
                    variants,
                },
            );
        }

        Ok(Self { entries })
    }

    /// Whether `tile` has a table.
    pub fn knows(&self, tile: TileId) -> bool {
        self.entries.contains_key(&tile)
    }

    fn entry(&self, tile: TileId, position: GridCoord) -> Result<&ResolverEntry, ResolutionError> {
        self.entries
            .get(&tile)
            .ok_or(ResolutionError::UnknownTile {
                tile_id: tile,
                position,
            })
    }

    /// Neighbor mask of `position` for `group`, looked up in `context`.
    pub fn mask_at(
        &self,
        context: &HashMap<GridCoord, TileId>,
        position: GridCoord,
        group: i32,
    ) -> Bitmask {
        Bitmask::from_fn(|d: Direction| {
            context
                .get(&(position + d.offset()))
                .and_then(|t| self.entries.get(t))
                .is_some_and(|e| e.group == Some(group))
        })
    }

    fn resolve_one(
        &self,
        context: &HashMap<GridCoord, TileId>,
        position: GridCoord,
        tile: TileId,
    ) -> Result<TileData, ResolutionError> {
        let entry = self.entry(tile, position)?;
        let Some(group) = entry.group else {
            return Ok(TileData {
                tile_id: tile,
                atlas_coords: entry.position_in_set,
            });
        };

        let mask = self.mask_at(context, position, group);
        match entry.variants.get(&mask) {
            Some(&atlas_coords) => Ok(TileData {
                tile_id: tile,
                atlas_coords,
            }),
            None => Err(ResolutionError::UnmatchedMask {
                tile: entry.name.clone(),
                tile_id: tile,
                position,
                mask,
            }),
        }
    }

    /// Resolve a batch. Output order matches `placements`; the batch fails
    /// as a whole on the first unresolvable placement.
    pub fn resolve(
        &self,
        placements: &[(GridCoord, TileId)],
    ) -> Result<Vec<(GridCoord, Option<TileData>)>, ResolutionError> {
        if placements.is_empty() {
            return Ok(Vec::new());
        }
        // Later placements at the same position win.
        let context: HashMap<GridCoord, TileId> = placements.iter().copied().collect();

        let one = |&(pos, tile): &(GridCoord, TileId)| {
            self.resolve_one(&context, pos, tile).map(|d| (pos, Some(d)))
        };
        if placements.len() >= PARALLEL_THRESHOLD {
            placements.par_iter().map(one).collect()
        } else {
            placements.iter().map(one).collect()
        }
    }

    /// Re-resolve `positions` against an existing placement map. Positions
    /// with no placement resolve to `None`, meaning "clear this cell".
    pub fn resolve_update(
        &self,
        context: &HashMap<GridCoord, TileId>,
        positions: &[GridCoord],
    ) -> Result<Vec<(GridCoord, Option<TileData>)>, ResolutionError> {
        positions
            .iter()
            .map(|&pos| match context.get(&pos) {
                Some(&tile) => self.resolve_one(context, pos, tile).map(|d| (pos, Some(d))),
                None => Ok((pos, None)),
            })
            .collect()
    }
}
