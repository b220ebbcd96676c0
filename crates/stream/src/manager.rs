//! Observer-driven chunk streaming.
//!
//! Each time the observer crosses into a new chunk the manager:
//! 1. computes the diamond window around it,
//! 2. releases workers that fell outside,
//! 3. replays stored records inside the window,
//! 4. grows the level through open connection slots until nothing in the window
//!    can be reached,
//! 5. prunes slots that are satisfied or whose owner went away.
//!
//! Everything runs synchronously inside one call.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use trailhead_carve::{ChunkGenerator, ChunkLayout, PlacementSink, anchor_point};
use trailhead_common::{GridCoord, LevelConfig, Side};
use trailhead_terrain::{HeightField, HeightSource, NoiseHeightSource};

use crate::budget::{FrameTimer, StreamStats};
use crate::error::StreamError;
use crate::fork::{choose_exits, pick_side};
use crate::graph::{CellState, ConnectionSlot, FrontierIssue, LevelGraph};
use crate::pool::{ChunkPool, ChunkWorker, SinkFactory, WorkerId};
use crate::record::ChunkRecord;
use crate::window::{diamond, in_diamond};

const FRAME_HISTORY: usize = 120;

/// Everything needed to continue a level in a later session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelState {
    pub config: LevelConfig,
    /// Resolved global seed (never zero).
    pub seed: u64,
    /// Position of the global RNG in its ChaCha stream.
    pub rng_word_pos: u128,
    pub next_creation_index: u64,
    pub observer: Option<GridCoord>,
    pub spawn: Vec3,
    pub records: Vec<ChunkRecord>,
}

enum Synthesis {
    Created,
    Collided,
}

/// Owns the level graph, the worker pool and the active window.
pub struct StreamingManager<S: PlacementSink> {
    config: LevelConfig,
    seed: u64,
    rng: ChaCha8Rng,
    generator: ChunkGenerator,
    heights: Box<dyn HeightSource>,
    graph: LevelGraph,
    pool: ChunkPool<S>,
    active: BTreeMap<GridCoord, WorkerId>,
    current: Option<GridCoord>,
    spawn: Vec3,
    stats: StreamStats,
    timer: FrameTimer,
}

impl<S: PlacementSink> StreamingManager<S> {
    /// Build a new level with noise terrain and materialize the window around the
    /// spawn point.
    pub fn new(config: LevelConfig, factory: SinkFactory<S>) -> Result<Self, StreamError> {
        config.validate()?;
        let seed = config.resolve_seed();
        let heights = Box::new(NoiseHeightSource::from_config(&config.terrain, seed));
        Self::start(config, seed, heights, factory)
    }

    /// Build a new level over a caller-supplied height source.
    pub fn with_height_source(
        config: LevelConfig,
        heights: Box<dyn HeightSource>,
        factory: SinkFactory<S>,
    ) -> Result<Self, StreamError> {
        config.validate()?;
        let seed = config.resolve_seed();
        Self::start(config, seed, heights, factory)
    }

    /// Continue a saved level. The window around the saved observer is rebuilt from
    /// the stored records.
    pub fn resume(state: LevelState, factory: SinkFactory<S>) -> Result<Self, StreamError> {
        let heights = Box::new(NoiseHeightSource::from_config(
            &state.config.terrain,
            state.seed,
        ));
        Self::resume_with_height_source(state, heights, factory)
    }

    pub fn resume_with_height_source(
        state: LevelState,
        heights: Box<dyn HeightSource>,
        factory: SinkFactory<S>,
    ) -> Result<Self, StreamError> {
        state.config.validate()?;
        if state.seed == 0 {
            return Err(StreamError::InvalidState("saved seed is zero".into()));
        }
        let dim = state.config.chunk_dim;
        if let Some(bad) = state.records.iter().find(|r| r.heights().dim() != dim) {
            return Err(StreamError::InvalidState(format!(
                "record at {} has a {}-cell height field, level uses {dim}",
                bad.coord(),
                bad.heights().dim()
            )));
        }

        let mut manager = Self::assemble(state.config, state.seed, heights, factory);
        manager.graph = LevelGraph::from_records(state.records, state.next_creation_index)?;
        manager.rng.set_word_pos(state.rng_word_pos);
        manager.spawn = state.spawn;
        tracing::info!(
            seed = manager.seed,
            records = manager.graph.record_count(),
            "resuming level"
        );
        if let Some(observer) = state.observer {
            manager.update_window(observer)?;
        }
        Ok(manager)
    }

    fn assemble(
        config: LevelConfig,
        seed: u64,
        heights: Box<dyn HeightSource>,
        factory: SinkFactory<S>,
    ) -> Self {
        let pool = ChunkPool::new(factory, config.effective_pool_capacity());
        Self {
            generator: ChunkGenerator::from_config(&config),
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            heights,
            graph: LevelGraph::new(),
            pool,
            active: BTreeMap::new(),
            current: None,
            spawn: Vec3::ZERO,
            stats: StreamStats::default(),
            timer: FrameTimer::new(FRAME_HISTORY),
            config,
        }
    }

    fn start(
        config: LevelConfig,
        seed: u64,
        heights: Box<dyn HeightSource>,
        factory: SinkFactory<S>,
    ) -> Result<Self, StreamError> {
        tracing::info!(seed, chunk_dim = config.chunk_dim, "building level");
        let mut manager = Self::assemble(config, seed, heights, factory);
        manager.create_origin()?;
        let spawn = manager.spawn;
        manager.on_observer_moved(spawn)?;
        Ok(manager)
    }

    /// The origin chunk: entered from its center, one random exit.
    fn create_origin(&mut self) -> Result<(), StreamError> {
        let coord = GridCoord::ORIGIN;
        let index = self.graph.allocate_index();
        let exits: Vec<Side> = pick_side(&mut self.rng, &[]).into_iter().collect();
        let chunk_seed: i32 = self.rng.random();
        let heights = HeightField::sample(self.heights.as_ref(), coord, self.config.chunk_dim);
        let record = ChunkRecord::new(
            coord,
            coord.world_origin(self.config.chunk_extent()),
            chunk_seed,
            Side::Center,
            exits,
            heights,
            index,
        );
        self.spawn = self.anchor_world_position(&record);
        tracing::debug!(exits = ?record.exits(), spawn = ?self.spawn, "origin chunk created");
        self.graph.register(record)
    }

    /// World position of the cell a walker enters a chunk at.
    fn anchor_world_position(&self, record: &ChunkRecord) -> Vec3 {
        let cell = anchor_point(record.entry(), self.config.chunk_dim);
        let bs = self.config.block_size;
        record.origin() + Vec3::new((cell.x as f32 + 0.5) * bs, bs, (cell.z as f32 + 0.5) * bs)
    }

    /// Feed the observer's world position. Returns whether the window changed.
    pub fn on_observer_moved(&mut self, position: Vec3) -> Result<bool, StreamError> {
        let coord = GridCoord::try_from_world(position, self.config.chunk_extent())
            .ok_or(StreamError::ObserverOutOfRange(position))?;
        if self.current == Some(coord) {
            return Ok(false);
        }
        self.update_window(coord)?;
        Ok(true)
    }

    fn update_window(&mut self, center: GridCoord) -> Result<(), StreamError> {
        let _span = tracing::info_span!("observer_moved", %center).entered();
        let started = Instant::now();
        self.current = Some(center);

        let radius = self.config.window_radius();
        let desired = diamond(center, radius);
        let mut stats = StreamStats::default();

        let leaving: Vec<GridCoord> = self
            .active
            .keys()
            .filter(|c| !in_diamond(**c, center, radius))
            .copied()
            .collect();
        for coord in leaving {
            if let Some(id) = self.active.remove(&coord) {
                self.pool.release(id);
                tracing::debug!(%coord, worker = %id, "chunk released");
                stats.chunks_released += 1;
            }
        }

        for &coord in &desired {
            if !self.active.contains_key(&coord) && self.graph.is_recorded(coord) {
                self.replay(coord)?;
                stats.chunks_replayed += 1;
            }
        }

        loop {
            let mut progressed = false;
            for &coord in &desired {
                if self.active.contains_key(&coord) {
                    continue;
                }
                if let CellState::Recorded(_) = self.graph.state(coord) {
                    continue;
                }
                let Some(slot) = self.graph.take_slot_for(coord) else {
                    continue;
                };
                match self.synthesize(slot)? {
                    Synthesis::Created => {
                        stats.chunks_synthesized += 1;
                        progressed = true;
                    }
                    Synthesis::Collided => stats.collisions += 1,
                }
            }
            if !progressed {
                break;
            }
        }

        stats.unreachable = desired
            .iter()
            .filter(|c| !self.active.contains_key(c))
            .count();
        self.prune_frontier();

        stats.active_chunks = self.active.len();
        stats.open_slots = self.graph.frontier().len();
        stats.tick_time = started.elapsed();
        self.timer.record(stats.tick_time);
        tracing::trace!(
            released = stats.chunks_released,
            replayed = stats.chunks_replayed,
            synthesized = stats.chunks_synthesized,
            unreachable = stats.unreachable,
            active = stats.active_chunks,
            "window update complete"
        );
        self.stats = stats;
        Ok(())
    }

    /// Re-materialize a stored record and reopen slots for its unresolved exits.
    fn replay(&mut self, coord: GridCoord) -> Result<(), StreamError> {
        let Some(record) = self.graph.record(coord) else {
            return Ok(());
        };
        let id = self.pool.acquire()?;
        let layout = materialize(&mut self.pool, &self.generator, id, record)?;
        self.active.insert(coord, id);
        tracing::debug!(%coord, worker = %id, "chunk replayed");
        self.open_exits(coord, &layout, id);
        Ok(())
    }

    /// Grow the level across an open slot.
    fn synthesize(&mut self, slot: ConnectionSlot) -> Result<Synthesis, StreamError> {
        let coord = slot.target();
        let entry = slot.side.opposite();
        let id = self.pool.acquire()?;

        let index = self.graph.allocate_index();
        let exits = choose_exits(&mut self.rng, entry, index, self.config.fork_frequency);
        let chunk_seed: i32 = self.rng.random();
        let heights = HeightField::sample(self.heights.as_ref(), coord, self.config.chunk_dim);
        let record = ChunkRecord::new(
            coord,
            coord.world_origin(self.config.chunk_extent()),
            chunk_seed,
            entry,
            exits,
            heights,
            index,
        );

        if let Err(e) = self.graph.register(record) {
            tracing::warn!(%coord, error = %e, "synthesis aborted; keeping existing record");
            self.pool.release(id);
            return Ok(Synthesis::Collided);
        }
        let Some(record) = self.graph.record(coord) else {
            self.pool.release(id);
            return Err(StreamError::InvalidState(format!("record at {coord} vanished")));
        };
        let layout = materialize(&mut self.pool, &self.generator, id, record)?;
        self.active.insert(coord, id);
        tracing::debug!(
            %coord,
            from = %slot.origin,
            %entry,
            exits = ?layout.exits,
            index,
            "chunk synthesized"
        );
        self.open_exits(coord, &layout, id);
        Ok(Synthesis::Created)
    }

    fn open_exits(&mut self, coord: GridCoord, layout: &ChunkLayout, owner: WorkerId) {
        for side in layout.realized_exits() {
            self.graph.open_slot(coord, side, owner);
        }
    }

    fn prune_frontier(&mut self) {
        let pool = &self.pool;
        let removed = self
            .graph
            .prune(|slot| pool.is_bound_to(slot.owner, slot.origin));
        if removed > 0 {
            tracing::trace!(removed, "pruned connection slots");
        }
    }

    /// Snapshot of everything needed to resume this level later.
    pub fn save_state(&self) -> LevelState {
        LevelState {
            config: self.config.clone(),
            seed: self.seed,
            rng_word_pos: self.rng.get_word_pos(),
            next_creation_index: self.graph.next_index(),
            observer: self.current,
            spawn: self.spawn,
            records: self.graph.records().cloned().collect(),
        }
    }

    /// Frontier closure breaches; empty when the graph is consistent.
    pub fn audit_frontier(&self) -> Vec<FrontierIssue> {
        self.graph.audit(|coord| self.active.contains_key(&coord))
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn graph(&self) -> &LevelGraph {
        &self.graph
    }

    pub fn pool(&self) -> &ChunkPool<S> {
        &self.pool
    }

    pub fn current_coord(&self) -> Option<GridCoord> {
        self.current
    }

    /// Where the observer starts: the origin chunk's entry anchor.
    pub fn spawn_point(&self) -> Vec3 {
        self.spawn
    }

    /// World position of the entry anchor of a recorded chunk.
    pub fn entry_position(&self, coord: GridCoord) -> Option<Vec3> {
        self.graph
            .record(coord)
            .map(|record| self.anchor_world_position(record))
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    pub fn frame_timer(&self) -> &FrameTimer {
        &self.timer
    }

    pub fn is_active(&self, coord: GridCoord) -> bool {
        self.active.contains_key(&coord)
    }

    pub fn active_coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        self.active.keys().copied()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// The worker materializing `coord`, if it is in the window.
    pub fn worker_at(&self, coord: GridCoord) -> Option<&ChunkWorker<S>> {
        self.active.get(&coord).and_then(|id| self.pool.worker(*id))
    }
}

/// Carve a record's layout and push it into a worker.
fn materialize<S: PlacementSink>(
    pool: &mut ChunkPool<S>,
    generator: &ChunkGenerator,
    id: WorkerId,
    record: &ChunkRecord,
) -> Result<ChunkLayout, StreamError> {
    let layout = generator.generate(record.seed(), record.entry(), record.exits());
    let plan = generator.plan(&layout, record.heights());
    let worker = pool.worker_mut(id).ok_or(StreamError::UnknownWorker(id))?;
    worker.materialize(record.coord(), record.origin(), layout.clone(), &plan);
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailhead_carve::BlockGrid;
    use trailhead_terrain::FlatHeightSource;

    fn config(window_size: u32, fork_frequency: i32) -> LevelConfig {
        LevelConfig {
            chunk_dim: 9,
            window_size,
            fork_frequency,
            seed: 4242,
            ..LevelConfig::default()
        }
    }

    fn manager(config: LevelConfig) -> StreamingManager<BlockGrid> {
        StreamingManager::with_height_source(
            config,
            Box::new(FlatHeightSource::new(0)),
            Box::new(|| Ok(BlockGrid::new())),
        )
        .unwrap()
    }

    #[test]
    fn origin_is_centered_with_one_exit() {
        let m = manager(config(5, 3));
        let origin = m.graph().record(GridCoord::ORIGIN).unwrap();
        assert_eq!(origin.entry(), Side::Center);
        assert_eq!(origin.exits().len(), 1);
        assert_eq!(origin.creation_index(), 0);
        assert!(m.is_active(GridCoord::ORIGIN));
        assert_eq!(m.current_coord(), Some(GridCoord::ORIGIN));
    }

    #[test]
    fn spawn_sits_on_the_origin_center() {
        let m = manager(config(5, 3));
        // 9-cell chunk, unit blocks: center cell (4,4) -> (4.5, 1.0, 4.5).
        assert_eq!(m.spawn_point(), Vec3::new(4.5, 1.0, 4.5));
        let worker = m.worker_at(GridCoord::ORIGIN).unwrap();
        assert!(worker.sink().is_open(trailhead_common::CellPos::new(4, 4)));
    }

    #[test]
    fn moving_within_a_chunk_is_a_no_op() {
        let mut m = manager(config(5, 3));
        assert!(!m.on_observer_moved(Vec3::new(1.0, 0.0, 8.5)).unwrap());
    }

    #[test]
    fn observer_beyond_the_grid_is_refused() {
        let mut m = manager(config(5, 3));
        let far = Vec3::new(f32::MAX, 0.0, 0.0);
        assert!(matches!(
            m.on_observer_moved(far),
            Err(StreamError::ObserverOutOfRange(_))
        ));
        assert!(m.on_observer_moved(Vec3::new(0.0, 0.0, f32::NAN)).is_err());
        assert_eq!(m.current_coord(), Some(GridCoord::ORIGIN));
        assert!(m.audit_frontier().is_empty());
    }

    #[test]
    fn initial_window_grows_along_the_origin_exit() {
        let m = manager(config(5, 0));
        let origin = m.graph().record(GridCoord::ORIGIN).unwrap();
        let next = GridCoord::ORIGIN.neighbor(origin.exits()[0]);
        assert!(m.graph().is_recorded(next));
        assert!(m.is_active(next));
        assert_eq!(
            m.graph().record(next).unwrap().entry(),
            origin.exits()[0].opposite()
        );
    }

    #[test]
    fn active_chunks_always_have_records() {
        let mut m = manager(config(5, 2));
        for step in 0..12 {
            m.on_observer_moved(Vec3::new(step as f32 * 9.0, 0.0, 0.0))
                .unwrap();
            for coord in m.active_coords() {
                assert!(m.graph().is_recorded(coord));
                assert_eq!(m.worker_at(coord).unwrap().binding(), Some(coord));
            }
            assert!(m.audit_frontier().is_empty(), "{:?}", m.audit_frontier());
        }
    }

    #[test]
    fn leaving_the_window_releases_workers() {
        let mut m = manager(config(3, 0));
        let before = m.active_count();
        assert!(before >= 1);
        m.on_observer_moved(Vec3::new(900.0, 0.0, 900.0)).unwrap();
        assert_eq!(m.active_count(), 0);
        assert_eq!(m.pool().in_use(), 0);
        assert_eq!(m.stats().chunks_released, before);
        assert!(m.graph().frontier().is_empty());
    }

    #[test]
    fn failing_factory_surfaces_as_error() {
        let result = StreamingManager::<BlockGrid>::with_height_source(
            config(3, 0),
            Box::new(FlatHeightSource::new(0)),
            Box::new(|| Err(crate::pool::WorkerError::MissingGenerator("none".into()))),
        );
        assert!(matches!(result, Err(StreamError::WorkerUnavailable(_))));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = StreamingManager::<BlockGrid>::with_height_source(
            LevelConfig {
                chunk_dim: 2,
                ..LevelConfig::default()
            },
            Box::new(FlatHeightSource::new(0)),
            Box::new(|| Ok(BlockGrid::new())),
        );
        assert!(matches!(result, Err(StreamError::Config(_))));
    }

    #[test]
    fn save_state_captures_everything() {
        let m = manager(config(5, 3));
        let state = m.save_state();
        assert_eq!(state.seed, 4242);
        assert_eq!(state.records.len(), m.graph().record_count());
        assert_eq!(state.next_creation_index, m.graph().next_index());
        assert_eq!(state.observer, Some(GridCoord::ORIGIN));
        assert_eq!(state.spawn, m.spawn_point());
    }
}
