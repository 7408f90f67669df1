use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bulk_autotile::{
    AutoTileConfig, AutoTileConfigBuilder, AutotileError, Bitmask, BitmaskSet, DrawerComposer,
    GridCoord, HeadlessSurface, ImageData, ImageProvider, TileDefinition, TileId, TileResolver,
};
use std::path::Path;

struct BlankSheet;

impl ImageProvider for BlankSheet {
    fn load(&self, _path: &Path) -> Result<ImageData, AutotileError> {
        Ok(ImageData::blank(256, 256))
    }
}

fn config() -> AutoTileConfig {
    let table: BitmaskSet = (0..=255u8)
        .map(|m| (GridCoord::new(i32::from(m % 16), i32::from(m / 16)), Bitmask(m)))
        .collect();
    AutoTileConfigBuilder::new()
        .tile_size(16)
        .bitmask_set("Blob", table)
        .tile_definition(
            "Ground",
            TileDefinition {
                layer: 0,
                image_file_name: "ground".into(),
                bitmask_name: "Blob".into(),
                position_in_set: GridCoord::ZERO,
                auto_tile_group: 0,
            },
        )
        .build()
        .unwrap()
}

/// Square with every third column missing, so masks vary.
fn chunk(size: i32) -> Vec<(GridCoord, TileId)> {
    (0..size)
        .flat_map(|y| (0..size).map(move |x| (x, y)))
        .filter(|&(x, _)| x % 3 != 2)
        .map(|(x, y)| (GridCoord::new(x, y), TileId(0)))
        .collect()
}

fn bench_resolve_64(c: &mut Criterion) {
    let config = config();
    let resolver = TileResolver::new(&config, &config.tile_ids()).unwrap();
    let placements = chunk(64);

    c.bench_function("resolve_64x64", |b| {
        b.iter(|| resolver.resolve(black_box(&placements)).unwrap());
    });
}

fn bench_resolve_256(c: &mut Criterion) {
    let config = config();
    let resolver = TileResolver::new(&config, &config.tile_ids()).unwrap();
    let placements = chunk(256);

    c.bench_function("resolve_256x256", |b| {
        b.iter(|| resolver.resolve(black_box(&placements)).unwrap());
    });
}

fn bench_draw_sync_256(c: &mut Criterion) {
    let mut drawer = DrawerComposer::from_config(config(), "bench")
        .build(HeadlessSurface::new(), &BlankSheet)
        .unwrap();
    let placements = chunk(256);

    c.bench_function("draw_sync_256x256", |b| {
        b.iter(|| {
            drawer.draw_tiles(0, black_box(&placements)).unwrap();
            drawer.clear();
        });
    });
}

criterion_group!(benches, bench_resolve_64, bench_resolve_256, bench_draw_sync_256);
criterion_main!(benches);
