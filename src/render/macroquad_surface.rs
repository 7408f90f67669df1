use crate::atlas::{ImageData, ImageProvider};
use crate::error::AutotileError;
use crate::render::cull::{camera_rect, cell_origin, visible_cells, CULL_MARGIN_CHUNKS};
use crate::spatial::{CellIndex, GridCoord, LayerIdx};
use crate::surface::{Cell, RenderSurface, SourceId};
use macroquad::prelude::*;
use std::collections::BTreeSet;
use std::path::Path;

struct TextureSource {
    tex: Texture2D,
    tile_size: u32,
    tiles: BTreeSet<GridCoord>,
}

/// Render surface that paints its cells with macroquad.
///
/// Creating sources uploads textures, so the surface must live on the thread
/// that owns the macroquad context.
#[derive(Default)]
pub struct MacroquadSurface {
    layers: Vec<CellIndex<Cell>>,
    sources: Vec<TextureSource>,
}

impl MacroquadSurface {
    /// Empty surface without sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw every layer, bottom first, restricted to the chunks around the
    /// pixel rectangle `[view_min, view_max]`.
    pub fn draw_visible_rect(&self, view_min: Vec2, view_max: Vec2) {
        let Some(tile_size) = self.sources.first().map(|s| s.tile_size) else {
            return;
        };
        let (min, max) = visible_cells(view_min, view_max, tile_size);

        for cells in &self.layers {
            for (_, bucket) in cells.chunks_in_rect(min, max, CULL_MARGIN_CHUNKS) {
                for (&pos, cell) in bucket {
                    self.draw_cell(pos, cell);
                }
            }
        }
    }

    /// Draw what `cam` sees.
    pub fn draw_camera(&self, cam: &Camera2D) {
        let (min, max) = camera_rect(cam);
        self.draw_visible_rect(min, max);
    }

    fn draw_cell(&self, pos: GridCoord, cell: &Cell) {
        let Some(src) = self.sources.get(cell.source.0 as usize) else {
            return;
        };
        let ts = src.tile_size as f32;
        let at = cell_origin(pos, src.tile_size);
        draw_texture_ex(
            &src.tex,
            at.x,
            at.y,
            WHITE,
            DrawTextureParams {
                source: Some(Rect::new(
                    cell.atlas_coords.x as f32 * ts,
                    cell.atlas_coords.y as f32 * ts,
                    ts,
                    ts,
                )),
                ..Default::default()
            },
        );
    }

    /// What is painted at `position`.
    pub fn cell(&self, layer: LayerIdx, position: GridCoord) -> Option<Cell> {
        self.layers.get(layer)?.get(position).copied()
    }
}

impl RenderSurface for MacroquadSurface {
    fn create_source(&mut self, image: &ImageData, tile_size: u32) -> Result<SourceId, String> {
        let (Ok(width), Ok(height)) = (u16::try_from(image.width), u16::try_from(image.height))
        else {
            return Err(format!(
                "{}x{} exceeds the {}px texture limit",
                image.width,
                image.height,
                u16::MAX
            ));
        };
        let tex = Texture2D::from_rgba8(width, height, &image.pixels);
        tex.set_filter(FilterMode::Nearest);
        self.sources.push(TextureSource {
            tex,
            tile_size,
            tiles: BTreeSet::new(),
        });
        Ok(SourceId(self.sources.len() as u32 - 1))
    }

    fn register_tile(&mut self, source: SourceId, local: GridCoord) {
        if let Some(src) = self.sources.get_mut(source.0 as usize) {
            src.tiles.insert(local);
        }
    }

    fn set_cell(
        &mut self,
        layer: LayerIdx,
        position: GridCoord,
        source: SourceId,
        atlas_coords: GridCoord,
    ) {
        if self.layers.len() <= layer {
            self.layers.resize_with(layer + 1, CellIndex::new);
        }
        self.layers[layer].insert(
            position,
            Cell {
                source,
                atlas_coords,
            },
        );
    }

    fn clear_cell(&mut self, layer: LayerIdx, position: GridCoord) {
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

/// Decodes image files (PNG and the other formats macroquad reads) from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacroquadImageProvider;

impl ImageProvider for MacroquadImageProvider {
    fn load(&self, path: &Path) -> Result<ImageData, AutotileError> {
        let bytes = std::fs::read(path).map_err(|e| AutotileError::ImageLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let image =
            Image::from_file_with_format(&bytes, None).map_err(|e| AutotileError::ImageLoad {
                path: path.to_path_buf(),
                reason: format!("{e:?}"),
            })?;
        log::debug!("Decoded {} ({}x{})", path.display(), image.width, image.height);

        Ok(ImageData {
            width: u32::from(image.width),
            height: u32::from(image.height),
            pixels: image.bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_image_is_refused_not_truncated() {
        let mut surface = MacroquadSurface::new();
        let wide = ImageData::blank(u32::from(u16::MAX) + 1, 1);
        assert!(surface.create_source(&wide, 16).is_err());
        assert_eq!(surface.sources.len(), 0);
    }

    #[test]
    fn missing_file_is_an_image_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.png");
        let err = MacroquadImageProvider.load(&path).unwrap_err();
        assert!(matches!(err, AutotileError::ImageLoad { path: p, .. } if p == path));
    }

    #[test]
    fn undecodable_file_is_an_image_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.png");
        std::fs::write(&path, b"not an image").unwrap();
        let err = MacroquadImageProvider.load(&path).unwrap_err();
        assert!(matches!(err, AutotileError::ImageLoad { .. }));
    }
}
