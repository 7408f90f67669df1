// tests/scheduler_tests.rs

use bulk_autotile::{
    AutoTileConfig, AutoTileConfigBuilder, AutotileError, Bitmask, BitmaskSet, DrawerComposer,
    DrawerOptions, GridCoord, HeadlessSurface, ImageData, ImageProvider, RenderSurface,
    SchedulerState, TileDefinition, TileDrawer, TileId, FIXED_TILE_GROUP,
};
use std::path::Path;

struct Sheets;

impl ImageProvider for Sheets {
    fn load(&self, _path: &Path) -> Result<ImageData, AutotileError> {
        Ok(ImageData::blank(256, 256))
    }
}

const GRASS: TileId = TileId(0);
const STONE: TileId = TileId(1);

/// Every mask `m` drawn at `(m % 16, m / 16)`.
fn full_table() -> BitmaskSet {
    (0..=255u8)
        .map(|m| (GridCoord::new(i32::from(m % 16), i32::from(m / 16)), Bitmask(m)))
        .collect()
}

fn config() -> AutoTileConfig {
    AutoTileConfigBuilder::new()
        .tile_size(16)
        .bitmask_set("Blob", full_table())
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
        .tile_definition(
            "Stone",
            TileDefinition {
                layer: 0,
                image_file_name: "props".into(),
                bitmask_name: String::new(),
                position_in_set: GridCoord::new(3, 1),
                auto_tile_group: FIXED_TILE_GROUP,
            },
        )
        .build()
        .unwrap()
}

fn drawer() -> TileDrawer<HeadlessSurface> {
    DrawerComposer::from_config(config(), "assets")
        .with_options(DrawerOptions {
            worker_threads: 4,
            ..DrawerOptions::default()
        })
        .build(HeadlessSurface::new(), &Sheets)
        .unwrap()
}

fn square(size: i32, tile: TileId) -> Vec<(GridCoord, TileId)> {
    (0..size)
        .flat_map(|y| (0..size).map(move |x| (GridCoord::new(x, y), tile)))
        .collect()
}

#[test]
fn sync_draw_twice_matches_sync_draw_once() {
    let batch = square(6, GRASS);

    let mut once = drawer();
    once.draw_tiles(0, &batch).unwrap();

    let mut twice = drawer();
    twice.draw_tiles(0, &batch).unwrap();
    twice.draw_tiles(0, &batch).unwrap();

    assert_eq!(once.surface().snapshot(0), twice.surface().snapshot(0));
    assert_eq!(once.surface().cell_count(0), 36);
}

#[test]
fn corner_and_center_pick_expected_variants() {
    let mut drawer = drawer();
    drawer.draw_tiles(0, &square(3, GRASS)).unwrap();

    let center = drawer.surface().cell(0, GridCoord::new(1, 1)).unwrap();
    assert_eq!(center.atlas_coords, GridCoord::new(15, 15));

    // Top-left corner sees Right, BottomRight and Bottom.
    let corner = drawer.surface().cell(0, GridCoord::new(0, 0)).unwrap();
    let mask = 8 + 16 + 32;
    assert_eq!(corner.atlas_coords, GridCoord::new(mask % 16, mask / 16));
}

#[test]
fn later_async_batch_wins_on_overlap() {
    let mut drawer = drawer();
    let a = square(10, GRASS);
    let b: Vec<_> = (0..10).map(|x| (GridCoord::new(x, 4), STONE)).collect();

    let ta = drawer.draw_tiles_async(0, a).unwrap();
    let tb = drawer.draw_tiles_async(0, b).unwrap();
    assert!(ta < tb);
    drawer.wait().unwrap();

    assert_eq!(drawer.state(), SchedulerState::Idle);
    assert_eq!(drawer.surface().cell_count(0), 100);
    let stone_source = drawer.atlas().source_of(STONE).unwrap();
    for x in 0..10 {
        let cell = drawer.surface().cell(0, GridCoord::new(x, 4)).unwrap();
        assert_eq!(cell.source, stone_source);
        assert_eq!(cell.atlas_coords, GridCoord::new(3, 1));
    }
}

#[test]
fn many_async_batches_apply_in_submission_order() {
    let mut drawer = drawer();
    // Every batch rewrites (0,0); alternate tiles so the final one is known.
    for i in 0..50 {
        let tile = if i % 2 == 0 { GRASS } else { STONE };
        drawer
            .draw_tiles_async(0, vec![(GridCoord::new(0, 0), tile)])
            .unwrap();
    }
    drawer.wait().unwrap();

    let cell = drawer.surface().cell(0, GridCoord::new(0, 0)).unwrap();
    assert_eq!(Some(cell.source), drawer.atlas().source_of(STONE));
}

#[test]
fn sync_draw_lands_after_pending_async_batches() {
    let mut drawer = drawer();
    drawer
        .draw_tiles_async(0, vec![(GridCoord::new(2, 2), STONE)])
        .unwrap();
    drawer.draw_tiles(0, &[(GridCoord::new(2, 2), GRASS)]).unwrap();

    let cell = drawer.surface().cell(0, GridCoord::new(2, 2)).unwrap();
    assert_eq!(Some(cell.source), drawer.atlas().source_of(GRASS));
    assert_eq!(drawer.pending(), 0);
}

#[test]
fn invalid_layer_is_rejected_before_any_mutation() {
    let mut drawer = drawer();
    let err = drawer
        .draw_tiles(3, &[(GridCoord::new(0, 0), GRASS)])
        .unwrap_err();
    assert!(matches!(err, AutotileError::Layout { layer: 3, .. }));
    assert_eq!(drawer.surface().writes(), 0);
}

#[test]
fn update_tiles_redraws_after_neighbors_change() {
    let mut drawer = drawer();
    drawer.draw_tiles(0, &[(GridCoord::new(0, 0), GRASS)]).unwrap();
    assert_eq!(
        drawer.surface().cell(0, GridCoord::new(0, 0)).unwrap().atlas_coords,
        GridCoord::ZERO
    );

    // A batch only sees its own placements, so (0,0) keeps its old variant.
    drawer.draw_tiles(0, &[(GridCoord::new(1, 0), GRASS)]).unwrap();
    assert_eq!(
        drawer.surface().cell(0, GridCoord::new(0, 0)).unwrap().atlas_coords,
        GridCoord::ZERO
    );

    drawer
        .update_tiles(0, &[GridCoord::new(0, 0), GridCoord::new(1, 0), GridCoord::new(7, 7)])
        .unwrap();
    let right = Bitmask::DEFAULT.update(bulk_autotile::Direction::Right, true).bits() as i32;
    assert_eq!(
        drawer.surface().cell(0, GridCoord::new(0, 0)).unwrap().atlas_coords,
        GridCoord::new(right % 16, right / 16)
    );
    assert_eq!(drawer.surface().cell(0, GridCoord::new(7, 7)), None);
}

#[test]
fn clear_removes_everything_and_drawing_resumes() {
    let mut drawer = drawer();
    drawer.draw_tiles_async(0, square(4, GRASS)).unwrap();
    drawer.clear();
    drawer.wait().unwrap();
    assert_eq!(drawer.surface().cell_count(0), 0);

    drawer.draw_tiles(0, &square(2, GRASS)).unwrap();
    assert_eq!(drawer.surface().cell_count(0), 4);
}
