#![warn(missing_docs)]

//! Bulk bitmask autotiling: resolve whole batches of tile placements against
//! their 8-neighborhood, pack tile images into atlas sources and apply the
//! result to a render surface, synchronously or from a worker pool.

pub mod atlas;
pub mod benchmark;
pub mod bitmask;
pub mod composer;
pub mod config;
mod error;
mod loader {
    pub mod json_config;
}
pub mod logging;
pub mod render {
    //! Macroquad adapters.
    /// Camera and pixel-rect to cell-rect math.
    pub mod cull;
    /// Texture-backed surface and image decoding.
    pub mod macroquad_surface;
}
pub mod resolver;
pub mod scheduler;
pub mod spatial;
pub mod surface;
pub mod terrain;
pub mod tileset;

pub use atlas::{AtlasLayout, AtlasPacker, ImageData, ImageProvider};
pub use benchmark::{BenchmarkReport, BenchmarkRun};
pub use bitmask::{Bitmask, Direction};
pub use composer::DrawerComposer;
pub use config::{
    AutoTileConfig, AutoTileConfigBuilder, BitmaskSet, TileDefinition, TileIdMap,
    FIXED_TILE_GROUP,
};
pub use error::{AutotileError, ConfigError, ResolutionError, Result};
pub use loader::json_config::image_path;
pub use render::macroquad_surface::{MacroquadImageProvider, MacroquadSurface};
pub use resolver::{TileData, TileResolver};
pub use scheduler::{BatchTicket, DrawQueue, DrawerOptions, SchedulerState, TileDrawer};
pub use spatial::{GridCoord, LayerIdx, TileId};
pub use surface::{Cell, DrawOp, HeadlessSurface, RenderSurface, SourceId};
pub use terrain::TerrainDefinition;
