use crate::spatial::GridCoord;
use macroquad::prelude::*;

/// Chunks drawn around the visible rectangle.
pub const CULL_MARGIN_CHUNKS: i32 = 1;

/// Inclusive cell rectangle covering the pixel rectangle `[view_min, view_max]`.
/// Corners may be given in any order.
pub fn visible_cells(view_min: Vec2, view_max: Vec2, tile_size: u32) -> (GridCoord, GridCoord) {
    let ts = tile_size.max(1) as f32;
    let to_cell = |v: f32| (v / ts).floor() as i32;

    let mut x_min = to_cell(view_min.x);
    let mut y_min = to_cell(view_min.y);
    let mut x_max = to_cell(view_max.x);
    let mut y_max = to_cell(view_max.y);
    if x_min > x_max {
        std::mem::swap(&mut x_min, &mut x_max);
    }
    if y_min > y_max {
        std::mem::swap(&mut y_min, &mut y_max);
    }
    (GridCoord::new(x_min, y_min), GridCoord::new(x_max, y_max))
}

/// World-space rectangle seen through `cam`.
pub fn camera_rect(cam: &Camera2D) -> (Vec2, Vec2) {
    let (viewport_width, viewport_height) = match cam.viewport {
        Some((_, _, w, h)) => (w as f32, h as f32),
        None => (screen_width(), screen_height()),
    };

    let half_w = viewport_width / cam.zoom.x / 2.0;
    let half_h = viewport_height / cam.zoom.y / 2.0;
    let half = Vec2::new(half_w.abs(), half_h.abs());
    (cam.target - half, cam.target + half)
}

/// Pixel position of the top-left corner of a cell.
#[inline]
pub fn cell_origin(cell: GridCoord, tile_size: u32) -> Vec2 {
    vec2(
        (cell.x as i64 * tile_size as i64) as f32,
        (cell.y as i64 * tile_size as i64) as f32,
    )
}
