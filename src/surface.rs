//! The render surface seam.
//!
//! A surface stores and paints grid cells. It is not assumed to be
//! thread-safe: every call happens on the context that owns the
//! [`TileDrawer`](crate::TileDrawer).

use crate::atlas::ImageData;
use crate::spatial::{CellIndex, GridCoord, LayerIdx};
use std::collections::{BTreeMap, BTreeSet};

/// Handle of an atlas source registered on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(pub u32);

/// Content of one painted cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    /// Source the tile comes from.
    pub source: SourceId,
    /// Tile inside the source, in tiles.
    pub atlas_coords: GridCoord,
}

/// One concrete mutation of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOp {
    /// Paint an atlas tile at a cell.
    Place {
        /// Target cell.
        position: GridCoord,
        /// Source to draw from.
        source: SourceId,
        /// Tile inside the source.
        atlas_coords: GridCoord,
    },
    /// Empty a cell.
    Erase {
        /// Cell to empty.
        position: GridCoord,
    },
}

impl DrawOp {
    /// Cell the op touches.
    pub fn position(&self) -> GridCoord {
        match *self {
            DrawOp::Place { position, .. } | DrawOp::Erase { position } => position,
        }
    }
}

/// Host storage that paints grid cells.
pub trait RenderSurface {
    /// Register an image as a tile source cut into `tile_size` squares.
    /// Fails with a reason when the surface cannot hold the image.
    fn create_source(&mut self, image: &ImageData, tile_size: u32) -> Result<SourceId, String>;

    /// Make the tile at `local` (in tiles) of `source` drawable.
    fn register_tile(&mut self, source: SourceId, local: GridCoord);

    /// Paint `atlas_coords` of `source` at `position`.
    fn set_cell(
        &mut self,
        layer: LayerIdx,
        position: GridCoord,
        source: SourceId,
        atlas_coords: GridCoord,
    );

    /// Empty one cell.
    fn clear_cell(&mut self, layer: LayerIdx, position: GridCoord);

    /// Empty every cell of `layer`.
    fn clear_layer(&mut self, layer: LayerIdx);

    /// Painted cells on `layer`.
    fn cell_count(&self, layer: LayerIdx) -> usize;

    /// Perform one [`DrawOp`].
    fn apply(&mut self, layer: LayerIdx, op: &DrawOp) {
        match *op {
            DrawOp::Place {
                position,
                source,
                atlas_coords,
            } => self.set_cell(layer, position, source, atlas_coords),
            DrawOp::Erase { position } => self.clear_cell(layer, position),
        }
    }
}

/// What a [`HeadlessSurface`] remembers of a source.
#[derive(Debug, Clone)]
pub struct HeadlessSource {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Tile edge in pixels.
    pub tile_size: u32,
    /// Registered tiles.
    pub tiles: BTreeSet<GridCoord>,
}

/// In-memory surface for tests, benchmarks and batch tools.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    layers: Vec<CellIndex<Cell>>,
    sources: Vec<HeadlessSource>,
    writes: u64,
}

impl HeadlessSurface {
    /// Empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    fn layer_mut(&mut self, layer: LayerIdx) -> &mut CellIndex<Cell> {
        if self.layers.len() <= layer {
            self.layers.resize_with(layer + 1, CellIndex::new);
        }
        &mut self.layers[layer]
    }

    /// What is stored at `position`.
    pub fn cell(&self, layer: LayerIdx, position: GridCoord) -> Option<Cell> {
        self.layers.get(layer)?.get(position).copied()
    }

    /// Ordered copy of a layer, for comparing surface states.
    pub fn snapshot(&self, layer: LayerIdx) -> BTreeMap<GridCoord, Cell> {
        self.layers
            .get(layer)
            .map(|cells| cells.iter().map(|(p, c)| (p, *c)).collect())
            .unwrap_or_default()
    }

    /// Sources in creation order.
    pub fn sources(&self) -> &[HeadlessSource] {
        &self.sources
    }

    /// Number of set/clear calls received so far.
    pub fn writes(&self) -> u64 {
        self.writes
    }
}

impl RenderSurface for HeadlessSurface {
    fn create_source(&mut self, image: &ImageData, tile_size: u32) -> Result<SourceId, String> {
        self.sources.push(HeadlessSource {
            width: image.width,
            height: image.height,
            tile_size,
            tiles: BTreeSet::new(),
        });
        Ok(SourceId(self.sources.len() as u32 - 1))
    }

    fn register_tile(&mut self, source: SourceId, local: GridCoord) {
        match self.sources.get_mut(source.0 as usize) {
            Some(src) => {
                src.tiles.insert(local);
            }
            None => log::warn!("register_tile on unknown source {source:?}"),
        }
    }

    fn set_cell(
        &mut self,
        layer: LayerIdx,
        position: GridCoord,
        source: SourceId,
        atlas_coords: GridCoord,
    ) {
        let registered = self
            .sources
            .get(source.0 as usize)
            .is_some_and(|s| s.tiles.contains(&atlas_coords));
        if !registered {
            log::warn!("set_cell with unregistered tile {atlas_coords} of {source:?}");
        }
        self.writes += 1;
        self.layer_mut(layer).insert(
            position,
            Cell {
                source,
                atlas_coords,
            },
        );
    }

    fn clear_cell(&mut self, layer: LayerIdx, position: GridCoord) {
        self.writes += 1;
        if let Some(cells) = self.layers.get_mut(layer) {
            cells.remove(position);
        }
    }

    fn clear_layer(&mut self, layer: LayerIdx) {
        if let Some(cells) = self.layers.get_mut(layer) {
            cells.clear();
        }
    }

    fn cell_count(&self, layer: LayerIdx) -> usize {
        self.layers.get(layer).map_or(0, CellIndex::len)
    }
}
