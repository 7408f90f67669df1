use anyhow::Context;
use bulk_autotile::{
    AutoTileConfig, AutoTileConfigBuilder, AutotileError, Bitmask, BitmaskSet, Direction,
    DrawerComposer, GridCoord, ImageData, ImageProvider, MacroquadSurface, TileDefinition, TileDrawer,
    TileId,
};
use macroquad::prelude::*;
use std::path::Path;

const TILE: u32 = 16;
const MAP: i32 = 80;

fn window_conf() -> Conf {
    Conf {
        window_title: "Bulk autotile".into(),
        window_width: 1280,
        window_height: 720,
        ..Default::default()
    }
}

/// Paints a 16x16 sheet where tile `(m % 16, m / 16)` shows mask `m`:
/// a filled square with an outline on every side that has no neighbor.
struct MaskSheet {
    fill: [u8; 4],
    edge: [u8; 4],
}

impl ImageProvider for MaskSheet {
    fn load(&self, _path: &Path) -> Result<ImageData, AutotileError> {
        let size = TILE * 16;
        let mut image = ImageData::blank(size, size);
        for m in 0..=255u8 {
            let mask = Bitmask(m);
            let (ox, oy) = (u32::from(m % 16) * TILE, u32::from(m / 16) * TILE);
            for y in 0..TILE {
                for x in 0..TILE {
                    let border = (y == 0 && !mask.contains(Direction::Top))
                        || (y == TILE - 1 && !mask.contains(Direction::Bottom))
                        || (x == 0 && !mask.contains(Direction::Left))
                        || (x == TILE - 1 && !mask.contains(Direction::Right));
                    let i = (((oy + y) * size + ox + x) * 4) as usize;
                    let color = if border { self.edge } else { self.fill };
                    image.pixels[i..i + 4].copy_from_slice(&color);
                }
            }
        }
        Ok(image)
    }
}

fn config() -> anyhow::Result<AutoTileConfig> {
    let table: BitmaskSet = (0..=255u8)
        .map(|m| (GridCoord::new(i32::from(m % 16), i32::from(m / 16)), Bitmask(m)))
        .collect();
    let config = AutoTileConfigBuilder::new()
        .tile_size(i64::from(TILE))
        .bitmask_set("Blob", table)
        .tile_definition(
            "Grass",
            TileDefinition {
                layer: 0,
                image_file_name: "grass".into(),
                bitmask_name: "Blob".into(),
                position_in_set: GridCoord::ZERO,
                auto_tile_group: 0,
            },
        )
        .build()?;
    Ok(config)
}

/// Cheap deterministic noise so the demo needs no RNG.
fn filled(x: i32, y: i32, seed: u32) -> bool {
    let mut h = (x as u32).wrapping_mul(374_761_393) ^ (y as u32).wrapping_mul(668_265_263) ^ seed;
    h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
    h % 100 < 55
}

fn blob(seed: u32, grass: TileId) -> Vec<(GridCoord, TileId)> {
    (0..MAP)
        .flat_map(|y| (0..MAP).map(move |x| (x, y)))
        .filter(|&(x, y)| filled(x / 2, y / 2, seed))
        .map(|(x, y)| (GridCoord::new(x, y), grass))
        .collect()
}

fn setup() -> anyhow::Result<(TileDrawer<MacroquadSurface>, TileId)> {
    let composer = DrawerComposer::from_config(config()?, "generated");
    let grass = composer
        .tile_ids()
        .get("Grass")
        .context("Grass has no tile id")?;
    let images = MaskSheet {
        fill: [80, 170, 60, 255],
        edge: [30, 70, 25, 255],
    };
    let drawer = composer.build(MacroquadSurface::new(), &images)?;
    Ok((drawer, grass))
}

#[macroquad::main(window_conf)]
async fn main() {
    bulk_autotile::logging::init();
    let (mut drawer, grass) = match setup() {
        Ok(v) => v,
        Err(e) => {
            log::error!("Setup failed: {e:#}");
            return;
        }
    };

    let mut seed = 1u32;
    drawer.draw_tiles_async(0, blob(seed, grass)).ok();
    if let Err(e) = drawer.wait() {
        log::error!("Initial draw failed: {e}");
    }

    loop {
        if is_key_pressed(KeyCode::Space) {
            seed = seed.wrapping_add(1);
            drawer.clear();
            if let Err(e) = drawer.draw_tiles_async(0, blob(seed, grass)) {
                log::error!("{e}");
            }
        }
        if is_mouse_button_pressed(MouseButton::Left) {
            let (mx, my) = mouse_position();
            let cell = GridCoord::new((mx / TILE as f32) as i32, (my / TILE as f32) as i32);
            let result = drawer.draw_tiles(0, &[(cell, grass)]).and_then(|_| {
                let around: Vec<_> = (-1..=1)
                    .flat_map(|dy| (-1..=1).map(move |dx| cell + GridCoord::new(dx, dy)))
                    .collect();
                drawer.update_tiles(0, &around)
            });
            if let Err(e) = result {
                log::error!("{e}");
            }
        }
        drawer.apply_ready();

        clear_background(BLACK);
        drawer
            .surface()
            .draw_visible_rect(Vec2::ZERO, vec2(screen_width(), screen_height()));
        draw_text(
            &format!("FPS: {}  pending: {}", get_fps(), drawer.pending()),
            20.0,
            30.0,
            30.0,
            WHITE,
        );

        next_frame().await;
    }
}
