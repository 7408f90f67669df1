//! Applies resolved batches to a render surface.
//!
//! Resolution runs on a worker pool; application happens only on the
//! context owning the [`TileDrawer`] (the surface-writer context). Every
//! async batch and every clear takes a ticket at submission, and batches are
//! applied strictly in ticket order no matter when their resolution ends.
//!
//! The drawer keeps a record of the logical tile at every cell. It is
//! written when a batch is applied, never at submission, so a batch that
//! fails to resolve leaves no trace in it.

use crate::atlas::AtlasLayout;
use crate::error::{AutotileError, ResolutionError};
use crate::resolver::{TileData, TileResolver};
use crate::spatial::{GridCoord, LayerIdx, TileId};
use crate::surface::{DrawOp, RenderSurface, SourceId};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Position of a batch in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatchTicket(pub u64);

/// Where the drawer stands relative to what has been submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Nothing submitted is left to apply.
    Idle,
    /// Batches are submitted but not applied yet.
    Pending,
    /// Batches are being written to the surface.
    Applying,
}

/// One caller-submitted unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawRequest {
    /// Target layer.
    pub layer: LayerIdx,
    /// Logical tiles by cell; later entries win on repeated cells.
    pub placements: Vec<(GridCoord, TileId)>,
}

/// Knobs for [`TileDrawer`] and the composer building it.
#[derive(Debug, Clone)]
pub struct DrawerOptions {
    /// Resolver worker threads, 0 lets rayon decide.
    pub worker_threads: usize,
    /// Extension of tile images inside the image directory.
    pub image_extension: String,
}

impl Default for DrawerOptions {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            image_extension: crate::tileset::DEFAULT_IMAGE_EXTENSION.to_owned(),
        }
    }
}

enum BatchOutcome {
    Draw {
        request: DrawRequest,
        ops: Result<Vec<DrawOp>, AutotileError>,
    },
    Clear,
}

struct Completed {
    ticket: BatchTicket,
    outcome: BatchOutcome,
}

/// Read-only tables shared with the workers.
struct Tables {
    resolver: TileResolver,
    sources: HashMap<TileId, SourceId>,
    layer_count: usize,
}

impl Tables {
    fn check_layer(&self, layer: LayerIdx) -> Result<(), AutotileError> {
        if layer >= self.layer_count {
            return Err(AutotileError::Layout {
                layer,
                layer_count: self.layer_count,
            });
        }
        Ok(())
    }

    fn to_ops(
        &self,
        resolved: Vec<(GridCoord, Option<TileData>)>,
    ) -> Result<Vec<DrawOp>, AutotileError> {
        resolved
            .into_iter()
            .map(|(position, data)| -> Result<DrawOp, AutotileError> {
                let Some(TileData {
                    tile_id,
                    atlas_coords,
                }) = data
                else {
                    return Ok(DrawOp::Erase { position });
                };
                let source = self.sources.get(&tile_id).copied().ok_or(
                    ResolutionError::UnknownTile {
                        tile_id,
                        position,
                    },
                )?;
                Ok(DrawOp::Place {
                    position,
                    source,
                    atlas_coords,
                })
            })
            .collect()
    }

    fn resolve_ops(
        &self,
        placements: &[(GridCoord, TileId)],
    ) -> Result<Vec<DrawOp>, AutotileError> {
        let resolved = self.resolver.resolve(placements)?;
        self.to_ops(resolved)
    }
}

struct QueueShared {
    next_ticket: AtomicU64,
    tables: Arc<Tables>,
    pool: rayon::ThreadPool,
    sender: Sender<Completed>,
}

/// Cloneable submission handle. Can be sent to other threads; batches it
/// submits are applied by the owning [`TileDrawer`].
#[derive(Clone)]
pub struct DrawQueue {
    shared: Arc<QueueShared>,
}

impl DrawQueue {
    fn take_ticket(&self) -> BatchTicket {
        BatchTicket(self.shared.next_ticket.fetch_add(1, Ordering::SeqCst))
    }

    /// Submit a batch for resolution. Returns without waiting; the layer is
    /// checked before anything is queued.
    pub fn draw_async(
        &self,
        layer: LayerIdx,
        placements: impl Into<Vec<(GridCoord, TileId)>>,
    ) -> Result<BatchTicket, AutotileError> {
        let tables = Arc::clone(&self.shared.tables);
        tables.check_layer(layer)?;
        let request = DrawRequest {
            layer,
            placements: placements.into(),
        };

        let ticket = self.take_ticket();
        log::debug!(
            "Queued batch {} on layer {} ({} placements)",
            ticket.0,
            layer,
            request.placements.len()
        );

        let sender = self.shared.sender.clone();
        self.shared.pool.spawn(move || {
            let ops = tables.resolve_ops(&request.placements);
            let outcome = BatchOutcome::Draw { request, ops };
            // The drawer may already be gone; nothing left to apply to then.
            let _ = sender.send(Completed { ticket, outcome });
        });
        Ok(ticket)
    }

    /// Queue a clear of every layer behind the batches submitted so far.
    pub fn clear(&self) -> BatchTicket {
        let ticket = self.take_ticket();
        let _ = self.shared.sender.send(Completed {
            ticket,
            outcome: BatchOutcome::Clear,
        });
        ticket
    }

    /// Number of tickets handed out so far.
    pub fn issued(&self) -> u64 {
        self.shared.next_ticket.load(Ordering::SeqCst)
    }

    /// Layers the drawer accepts, `0..layer_count`.
    pub fn layer_count(&self) -> usize {
        self.shared.tables.layer_count
    }
}

/// Owns the render surface and applies batches to it in submission order.
pub struct TileDrawer<S: RenderSurface> {
    surface: S,
    atlas: AtlasLayout,
    queue: DrawQueue,
    receiver: Receiver<Completed>,
    ready: BTreeMap<BatchTicket, BatchOutcome>,
    next_apply: u64,
    state: SchedulerState,
    deferred_errors: Vec<(BatchTicket, AutotileError)>,
    /// Logical tile per cell and layer, as applied.
    placed: Vec<HashMap<GridCoord, TileId>>,
}

impl<S: RenderSurface> TileDrawer<S> {
    /// Install `atlas` on `surface` (if not done yet) and start the
    /// resolver workers.
    pub fn new(
        mut surface: S,
        mut atlas: AtlasLayout,
        resolver: TileResolver,
        options: &DrawerOptions,
    ) -> Result<Self, AutotileError> {
        if !atlas.is_installed() {
            atlas.install(&mut surface)?;
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.worker_threads)
            .thread_name(|i| format!("autotile-resolve-{i}"))
            .build()?;

        let layer_count = atlas.layer_count();
        let tables = Arc::new(Tables {
            resolver,
            sources: atlas.source_table(),
            layer_count,
        });
        let (sender, receiver) = unbounded();
        let queue = DrawQueue {
            shared: Arc::new(QueueShared {
                next_ticket: AtomicU64::new(0),
                tables,
                pool,
                sender,
            }),
        };

        Ok(Self {
            surface,
            atlas,
            queue,
            receiver,
            ready: BTreeMap::new(),
            next_apply: 0,
            state: SchedulerState::Idle,
            deferred_errors: Vec::new(),
            placed: vec![HashMap::new(); layer_count],
        })
    }

    /// Resolve and apply a batch right away. Earlier async batches are
    /// drained first so this batch lands after them.
    pub fn draw_tiles(
        &mut self,
        layer: LayerIdx,
        placements: &[(GridCoord, TileId)],
    ) -> Result<(), AutotileError> {
        let tables = Arc::clone(&self.queue.shared.tables);
        tables.check_layer(layer)?;
        self.drain_until(self.queue.issued());

        let ops = self
            .queue
            .shared
            .pool
            .install(|| tables.resolve_ops(placements))?;
        self.apply_ops(layer, &ops);
        self.placed[layer].extend(placements.iter().copied());
        Ok(())
    }

    /// Submit a batch for asynchronous resolution; see [`DrawQueue::draw_async`].
    pub fn draw_tiles_async(
        &self,
        layer: LayerIdx,
        placements: impl Into<Vec<(GridCoord, TileId)>>,
    ) -> Result<BatchTicket, AutotileError> {
        self.queue.draw_async(layer, placements)
    }

    /// Block until every batch submitted before this call is applied.
    /// Returns the first failure among those batches; the rest are logged.
    pub fn wait(&mut self) -> Result<(), AutotileError> {
        self.drain_until(self.queue.issued());

        let mut errors = std::mem::take(&mut self.deferred_errors).into_iter();
        match errors.next() {
            None => Ok(()),
            Some((ticket, first)) => {
                for (t, e) in errors {
                    log::warn!("Batch {} also failed: {}", t.0, e);
                }
                log::debug!("Reporting failure of batch {}", ticket.0);
                Err(first)
            }
        }
    }

    /// Remove all cells of every layer, after the batches already queued.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.apply_ready();
    }

    /// Redraw already-placed cells, e.g. after their neighbors changed.
    /// Positions with no recorded placement are erased.
    pub fn update_tiles(
        &mut self,
        layer: LayerIdx,
        positions: &[GridCoord],
    ) -> Result<(), AutotileError> {
        let tables = Arc::clone(&self.queue.shared.tables);
        tables.check_layer(layer)?;
        self.drain_until(self.queue.issued());

        let resolved = tables.resolver.resolve_update(&self.placed[layer], positions)?;
        let ops = tables.to_ops(resolved)?;
        self.apply_ops(layer, &ops);
        Ok(())
    }

    /// Apply whatever is resolved and next in order, without blocking.
    /// Returns how many batches were applied.
    pub fn apply_ready(&mut self) -> usize {
        loop {
            match self.receiver.try_recv() {
                Ok(done) => {
                    self.ready.insert(done.ticket, done.outcome);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        self.apply_in_order()
    }

    fn drain_until(&mut self, target: u64) {
        loop {
            self.apply_in_order();
            if self.next_apply >= target {
                break;
            }
            match self.receiver.recv() {
                Ok(done) => {
                    self.ready.insert(done.ticket, done.outcome);
                }
                Err(_) => {
                    log::error!(
                        "Resolver channel closed with {} batches pending",
                        target - self.next_apply
                    );
                    break;
                }
            }
        }
    }

    fn apply_in_order(&mut self) -> usize {
        let mut applied = 0;
        while let Some(outcome) = self.ready.remove(&BatchTicket(self.next_apply)) {
            self.state = SchedulerState::Applying;
            let ticket = BatchTicket(self.next_apply);
            match outcome {
                BatchOutcome::Draw {
                    request,
                    ops: Ok(ops),
                } => {
                    log::debug!("Applying batch {} ({} ops)", ticket.0, ops.len());
                    self.apply_ops(request.layer, &ops);
                    self.placed[request.layer].extend(request.placements);
                }
                BatchOutcome::Draw { ops: Err(e), .. } => {
                    log::error!("Batch {} failed to resolve: {}", ticket.0, e);
                    self.deferred_errors.push((ticket, e));
                }
                BatchOutcome::Clear => {
                    for layer in 0..self.layer_count() {
                        self.surface.clear_layer(layer);
                    }
                    self.placed.iter_mut().for_each(HashMap::clear);
                }
            }
            self.next_apply += 1;
            applied += 1;
        }

        self.state = if self.next_apply < self.queue.issued() {
            SchedulerState::Pending
        } else {
            SchedulerState::Idle
        };
        applied
    }

    fn apply_ops(&mut self, layer: LayerIdx, ops: &[DrawOp]) {
        for op in ops {
            self.surface.apply(layer, op);
        }
    }

    /// Submission handle usable from other threads.
    pub fn queue(&self) -> DrawQueue {
        self.queue.clone()
    }

    /// Batches submitted but not applied yet.
    pub fn pending(&self) -> u64 {
        self.queue.issued() - self.next_apply
    }

    /// Current scheduler state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Layers the drawer accepts, `0..layer_count`.
    pub fn layer_count(&self) -> usize {
        self.queue.layer_count()
    }

    /// The installed atlas.
    pub fn atlas(&self) -> &AtlasLayout {
        &self.atlas
    }

    /// The surface being drawn to.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Logical tile applied at a cell, if any.
    pub fn placed_tile(&self, layer: LayerIdx, position: GridCoord) -> Option<TileId> {
        self.placed.get(layer)?.get(&position).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::{AtlasPacker, ImageData, ImageProvider};
    use crate::bitmask::{Bitmask, Direction};
    use crate::config::{AutoTileConfig, AutoTileConfigBuilder, BitmaskSet, TileDefinition};
    use crate::surface::HeadlessSurface;
    use crate::tileset::load_tile_resources;
    use std::path::Path;

    struct Blank;

    impl ImageProvider for Blank {
        fn load(&self, _path: &Path) -> Result<ImageData, AutotileError> {
            Ok(ImageData::blank(256, 256))
        }
    }

    const GRASS: TileId = TileId(0);

    fn config(set: BitmaskSet) -> AutoTileConfig {
        AutoTileConfigBuilder::new()
            .tile_size(16)
            .bitmask_set("G", set)
            .tile_definition(
                "Grass",
                TileDefinition {
                    layer: 1,
                    image_file_name: "grass".into(),
                    bitmask_name: "G".into(),
                    position_in_set: GridCoord::ZERO,
                    auto_tile_group: 0,
                },
            )
            .build()
            .unwrap()
    }

    fn drawer(set: BitmaskSet) -> TileDrawer<HeadlessSurface> {
        let config = config(set);
        let ids = config.tile_ids();
        let tiles = load_tile_resources(&config, &ids, Path::new("img"), "png").unwrap();
        let atlas = AtlasPacker::pack(&tiles, config.tile_size(), &Blank).unwrap();
        let resolver = TileResolver::new(&config, &ids).unwrap();
        let options = DrawerOptions {
            worker_threads: 2,
            ..DrawerOptions::default()
        };
        TileDrawer::new(HeadlessSurface::new(), atlas, resolver, &options).unwrap()
    }

    fn isolated_only() -> BitmaskSet {
        [(GridCoord::ZERO, Bitmask::DEFAULT)].into_iter().collect()
    }

    #[test]
    fn new_installs_the_atlas() {
        let drawer = drawer(isolated_only());
        assert!(drawer.atlas().is_installed());
        assert_eq!(drawer.surface().sources().len(), 1);
        assert_eq!(drawer.layer_count(), 2);
        assert_eq!(drawer.state(), SchedulerState::Idle);
    }

    #[test]
    fn sync_draw_applies_before_returning() {
        let mut drawer = drawer(isolated_only());
        drawer
            .draw_tiles(1, &[(GridCoord::new(0, 0), GRASS), (GridCoord::new(4, 4), GRASS)])
            .unwrap();
        assert_eq!(drawer.surface().cell_count(1), 2);
        assert_eq!(drawer.placed_tile(1, GridCoord::new(4, 4)), Some(GRASS));
    }

    #[test]
    fn layer_out_of_range_fails_before_queueing() {
        let mut drawer = drawer(isolated_only());
        let err = drawer.draw_tiles_async(2, vec![(GridCoord::ZERO, GRASS)]).unwrap_err();
        assert!(matches!(err, AutotileError::Layout { layer: 2, layer_count: 2 }));
        assert_eq!(drawer.pending(), 0);
        assert!(drawer.wait().is_ok());
    }

    #[test]
    fn failed_async_batch_surfaces_at_wait_and_applies_nothing() {
        let mut drawer = drawer(isolated_only());
        // Neighbors need the Right/Left entries, which are missing.
        drawer
            .draw_tiles_async(1, vec![(GridCoord::new(0, 0), GRASS), (GridCoord::new(1, 0), GRASS)])
            .unwrap();
        drawer
            .draw_tiles_async(1, vec![(GridCoord::new(9, 9), GRASS)])
            .unwrap();

        let err = drawer.wait().unwrap_err();
        assert!(matches!(
            err,
            AutotileError::Resolution(ResolutionError::UnmatchedMask { .. })
        ));
        assert_eq!(drawer.surface().cell_count(1), 1);
        assert!(drawer.wait().is_ok());
        assert_eq!(drawer.state(), SchedulerState::Idle);
    }

    #[test]
    fn clear_is_ordered_after_pending_batches() {
        let mut drawer = drawer(isolated_only());
        drawer
            .draw_tiles_async(1, vec![(GridCoord::new(0, 0), GRASS)])
            .unwrap();
        drawer.clear();
        drawer
            .draw_tiles_async(1, vec![(GridCoord::new(5, 0), GRASS)])
            .unwrap();
        drawer.wait().unwrap();

        let cells = drawer.surface().snapshot(1);
        assert_eq!(cells.keys().copied().collect::<Vec<_>>(), [GridCoord::new(5, 0)]);
        assert_eq!(drawer.placed_tile(1, GridCoord::new(0, 0)), None);
    }

    #[test]
    fn queue_handle_submits_from_other_threads() {
        let mut drawer = drawer(isolated_only());
        let queue = drawer.queue();
        std::thread::spawn(move || {
            for i in 0..8 {
                queue
                    .draw_async(1, vec![(GridCoord::new(i * 3, 0), GRASS)])
                    .unwrap();
            }
        })
        .join()
        .unwrap();

        assert_eq!(drawer.pending(), 8);
        drawer.wait().unwrap();
        assert_eq!(drawer.pending(), 0);
        assert_eq!(drawer.surface().cell_count(1), 8);
    }

    #[test]
    fn failed_batch_is_not_recorded_for_updates() {
        let mut drawer = drawer(isolated_only());
        drawer
            .draw_tiles_async(
                1,
                vec![
                    (GridCoord::new(0, 0), GRASS),
                    (GridCoord::new(1, 0), GRASS),
                    (GridCoord::new(5, 5), GRASS),
                ],
            )
            .unwrap();
        assert!(drawer.wait().is_err());
        assert_eq!(drawer.placed_tile(1, GridCoord::new(5, 5)), None);

        drawer.update_tiles(1, &[GridCoord::new(5, 5)]).unwrap();
        assert_eq!(drawer.surface().cell_count(1), 0);

        // A later isolated tile next to the failed cells sees no neighbors.
        drawer.draw_tiles(1, &[(GridCoord::new(2, 0), GRASS)]).unwrap();
        drawer.update_tiles(1, &[GridCoord::new(2, 0)]).unwrap();
        assert_eq!(
            drawer.surface().cell(1, GridCoord::new(2, 0)).unwrap().atlas_coords,
            GridCoord::ZERO
        );
    }

    #[test]
    fn batches_finishing_out_of_order_apply_in_ticket_order() {
        let right = Direction::Right.bit();
        let left = Direction::Left.bit();
        let mut drawer = drawer(
            [
                (GridCoord::new(0, 0), Bitmask::DEFAULT),
                (GridCoord::new(1, 0), Bitmask(right)),
                (GridCoord::new(2, 0), Bitmask(left)),
            ]
            .into_iter()
            .collect(),
        );

        let a = DrawRequest {
            layer: 1,
            placements: vec![(GridCoord::new(0, 0), GRASS), (GridCoord::new(1, 0), GRASS)],
        };
        let b = DrawRequest {
            layer: 1,
            placements: vec![(GridCoord::new(0, 0), GRASS)],
        };
        let ta = drawer.queue.take_ticket();
        let tb = drawer.queue.take_ticket();
        let completed = |ticket, request: DrawRequest| {
            let ops = drawer.queue.shared.tables.resolve_ops(&request.placements);
            Completed {
                ticket,
                outcome: BatchOutcome::Draw { request, ops },
            }
        };
        let done_a = completed(ta, a);
        let done_b = completed(tb, b);
        let sender = drawer.queue.shared.sender.clone();

        // B resolves first: nothing may be applied until A arrives.
        sender.send(done_b).unwrap();
        assert_eq!(drawer.apply_ready(), 0);
        assert_eq!(drawer.surface().cell_count(1), 0);
        assert_eq!(drawer.state(), SchedulerState::Pending);

        sender.send(done_a).unwrap();
        assert_eq!(drawer.apply_ready(), 2);
        assert_eq!(drawer.state(), SchedulerState::Idle);

        // B alone sees no neighbor at (0,0), so its variant wins over A's.
        let surface = drawer.surface();
        assert_eq!(surface.cell(1, GridCoord::new(0, 0)).unwrap().atlas_coords, GridCoord::ZERO);
        assert_eq!(
            surface.cell(1, GridCoord::new(1, 0)).unwrap().atlas_coords,
            GridCoord::new(2, 0)
        );
        assert_eq!(drawer.placed_tile(1, GridCoord::new(1, 0)), Some(GRASS));
    }
}
