use bulk_autotile::{
    AutoTileConfigBuilder, AutotileError, Bitmask, BitmaskSet, BenchmarkRun, DrawerComposer,
    GridCoord, HeadlessSurface, ImageData, ImageProvider, TileDefinition, TileId,
};
use std::path::Path;

const SIZE: i32 = 256;
const REPEATS: usize = 20;

struct BlankSheet;

impl ImageProvider for BlankSheet {
    fn load(&self, _path: &Path) -> Result<ImageData, AutotileError> {
        Ok(ImageData::blank(256, 256))
    }
}

fn main() -> anyhow::Result<()> {
    bulk_autotile::logging::init();

    let table: BitmaskSet = (0..=255u8)
        .map(|m| (GridCoord::new(i32::from(m % 16), i32::from(m / 16)), Bitmask(m)))
        .collect();
    let config = AutoTileConfigBuilder::new()
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
        .build()?;
    let mut drawer = DrawerComposer::from_config(config, "bench").build(HeadlessSurface::new(), &BlankSheet)?;

    let chunk: Vec<_> = (0..SIZE)
        .flat_map(|y| (0..SIZE).map(move |x| (GridCoord::new(x, y), TileId(0))))
        .collect();

    println!("{SIZE}x{SIZE} cells, {REPEATS} repeats");

    let drawer = std::cell::RefCell::new(&mut drawer);
    let sync = BenchmarkRun::new(REPEATS).run(
        |_| {
            if let Err(e) = drawer.borrow_mut().draw_tiles(0, &chunk) {
                log::error!("{e}");
            }
        },
        |_| drawer.borrow_mut().clear(),
    );
    if let Some(report) = sync {
        println!("sync:  {report}");
    }

    let batches: Vec<Vec<_>> = chunk.chunks(4096).map(<[_]>::to_vec).collect();
    let not_sync = BenchmarkRun::new(REPEATS).run(
        |_| {
            let mut d = drawer.borrow_mut();
            for batch in &batches {
                if let Err(e) = d.draw_tiles_async(0, batch.clone()) {
                    log::error!("{e}");
                }
            }
            if let Err(e) = d.wait() {
                log::error!("{e}");
            }
        },
        |_| drawer.borrow_mut().clear(),
    );
    if let Some(report) = not_sync {
        println!("async: {report}");
    }
    Ok(())
}
