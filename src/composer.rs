//! Wires a config, its images and a surface into a ready [`TileDrawer`].

use crate::atlas::{AtlasPacker, ImageProvider};
use crate::config::{AutoTileConfig, TileIdMap};
use crate::error::AutotileError;
use crate::resolver::TileResolver;
use crate::scheduler::{DrawerOptions, TileDrawer};
use crate::surface::RenderSurface;
use crate::tileset::load_tile_resources;
use std::path::{Path, PathBuf};

/// Loads, packs and installs everything a [`TileDrawer`] needs.
pub struct DrawerComposer {
    config: AutoTileConfig,
    image_dir: PathBuf,
    tile_ids: TileIdMap,
    options: DrawerOptions,
}

impl DrawerComposer {
    /// Compose with an explicit id assignment.
    pub fn new(config: AutoTileConfig, image_dir: impl Into<PathBuf>, tile_ids: TileIdMap) -> Self {
        Self {
            config,
            image_dir: image_dir.into(),
            tile_ids,
            options: DrawerOptions::default(),
        }
    }

    /// Compose with ids assigned in definition order.
    pub fn from_config(config: AutoTileConfig, image_dir: impl Into<PathBuf>) -> Self {
        let tile_ids = config.tile_ids();
        Self::new(config, image_dir, tile_ids)
    }

    /// Replace the default [`DrawerOptions`].
    pub fn with_options(mut self, options: DrawerOptions) -> Self {
        self.options = options;
        self
    }

    /// The loaded config.
    pub fn config(&self) -> &AutoTileConfig {
        &self.config
    }

    /// Name to id mapping the drawer will use.
    pub fn tile_ids(&self) -> &TileIdMap {
        &self.tile_ids
    }

    /// Directory tile images are read from.
    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Load every tile image, pack and install the atlas on `surface`, and
    /// start the drawer. Fails before any drawing on config or image errors.
    pub fn build<S, P>(&self, mut surface: S, images: &P) -> Result<TileDrawer<S>, AutotileError>
    where
        S: RenderSurface,
        P: ImageProvider + ?Sized,
    {
        let tiles = load_tile_resources(
            &self.config,
            &self.tile_ids,
            &self.image_dir,
            &self.options.image_extension,
        )?;
        let mut atlas = AtlasPacker::pack(&tiles, self.config.tile_size(), images)?;
        let resolver = TileResolver::new(&self.config, &self.tile_ids)?;
        atlas.install(&mut surface)?;

        log::info!(
            "Drawer ready: {} tiles from {}",
            self.tile_ids.len(),
            self.image_dir.display()
        );
        TileDrawer::new(surface, atlas, resolver, &self.options)
    }
}
