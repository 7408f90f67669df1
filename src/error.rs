//! Error types. Configuration and image errors surface before drawing,
//! resolution errors per batch, layout errors before any surface mutation.

use crate::bitmask::Bitmask;
use crate::spatial::{GridCoord, LayerIdx, TileId};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Malformed or inconsistent configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `tileSize` is zero, negative or too large.
    #[error("tile size must be positive, got {0}")]
    NonPositiveTileSize(i64),

    /// An autotiled definition names a bitmask set that does not exist.
    #[error("tile '{tile}' is autotiled but bitmask set '{bitmask}' does not exist")]
    MissingBitmaskSet {
        /// Definition name.
        tile: String,
        /// Missing set name.
        bitmask: String,
    },

    /// A definition's layer is below zero.
    #[error("tile '{tile}' has a negative layer {layer}")]
    NegativeLayer {
        /// Definition name.
        tile: String,
        /// Layer as written.
        layer: i64,
    },

    /// A bitmask set key is not of the form `"x,y"`.
    #[error("bitmask set '{set}' has an invalid key {key:?}, expected \"x,y\"")]
    InvalidCoordKey {
        /// Set name.
        set: String,
        /// Offending key.
        key: String,
    },

    /// A bitmask set value does not fit in a byte.
    #[error("bitmask set '{set}' maps {key} to {value}, outside 0..=255")]
    MaskOutOfRange {
        /// Set name.
        set: String,
        /// Key of the entry.
        key: String,
        /// Value as written.
        value: i64,
    },

    /// A defined tile has no id in the id map.
    #[error("tile name '{0}' has no tile id")]
    MissingTileId(String),

    /// An id map names a tile the configuration does not define.
    #[error("tile name '{0}' is not defined in the configuration")]
    UnknownTileName(String),

    /// Two tile names share one id.
    #[error("tile id {id} is assigned to both '{first}' and '{second}'")]
    DuplicateTileId {
        /// The shared id.
        id: TileId,
        /// Name holding the id first.
        first: String,
        /// Name that tried to take it.
        second: String,
    },

    /// A tile's atlas coordinates fall outside its image.
    #[error("tile {coord} of {path} lies outside the {width}x{height} image")]
    TileOutsideImage {
        /// Image file.
        path: PathBuf,
        /// Atlas coordinates, in tiles.
        coord: GridCoord,
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },

    /// Unusable terrain definition.
    #[error("terrain definition error: {0}")]
    Terrain(String),
}

/// A placement that cannot be turned into an atlas tile.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The neighbor mask has no entry in the tile's bitmask set.
    #[error("tile '{tile}' ({tile_id}) at {position} has no bitmask entry for mask {mask}")]
    UnmatchedMask {
        /// Definition name.
        tile: String,
        /// Logical tile id.
        tile_id: TileId,
        /// Cell being resolved.
        position: GridCoord,
        /// Computed mask.
        mask: Bitmask,
    },

    /// The tile id is not part of the configuration.
    #[error("unknown tile id {tile_id} at {position}")]
    UnknownTile {
        /// Unknown id.
        tile_id: TileId,
        /// Cell it was placed at.
        position: GridCoord,
    },
}

/// Error type for configuration, packing and drawing.
#[derive(Debug, Error)]
pub enum AutotileError {
    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// See [`ResolutionError`].
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// An image could not be read, decoded or uploaded.
    #[error("failed to load image {path}: {reason}")]
    ImageLoad {
        /// Image file.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// Layer index outside `0..layer_count`.
    #[error("layer {layer} is outside the configured range 0..{layer_count}")]
    Layout {
        /// Requested layer.
        layer: LayerIdx,
        /// Number of configured layers.
        layer_count: usize,
    },

    /// The resolver thread pool could not start.
    #[error("failed to start resolver workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// Reading or writing a file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A JSON document is malformed.
    #[error("JSON error in {path}: {source}")]
    Json {
        /// Document path, `<inline>` for strings.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result alias used throughout the crate.
pub type Result<T, E = AutotileError> = std::result::Result<T, E>;
