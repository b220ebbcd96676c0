use glam::Vec3;
use std::fmt;
use trailhead_carve::PlacementSink;
use trailhead_common::{GridCoord, Side};
use trailhead_stream::{FrontierIssue, StreamingManager, WorkerId, forks_at};

/// Read-only queries against a running level for debugging and the CLI.
pub struct LevelInspector;

impl LevelInspector {
    pub fn summary<S: PlacementSink>(manager: &StreamingManager<S>) -> LevelSummary {
        let graph = manager.graph();
        let pool = manager.pool();
        LevelSummary {
            seed: manager.seed(),
            observer: manager.current_coord(),
            records: graph.record_count(),
            forks: graph.records().filter(|r| r.exits().len() > 1).count(),
            next_index: graph.next_index(),
            active: manager.active_count(),
            open_slots: graph.frontier().len(),
            pool_total: pool.total(),
            pool_idle: pool.idle(),
            overflow_allocations: pool.overflow_allocations(),
        }
    }

    /// Frontier closure check. Issues are also logged at warn level.
    pub fn audit_frontier<S: PlacementSink>(manager: &StreamingManager<S>) -> Vec<FrontierIssue> {
        let issues = manager.audit_frontier();
        for issue in &issues {
            tracing::warn!(?issue, "frontier closure violated");
        }
        issues
    }

    pub fn inspect_chunk<S: PlacementSink>(
        manager: &StreamingManager<S>,
        coord: GridCoord,
    ) -> Option<ChunkInfo> {
        let record = manager.graph().record(coord)?;
        let worker = manager.worker_at(coord);
        Some(ChunkInfo {
            coord,
            origin: record.origin(),
            seed: record.seed(),
            entry: record.entry(),
            exits: record.exits().to_vec(),
            creation_index: record.creation_index(),
            forked: forks_at(record.creation_index(), manager.config().fork_frequency),
            worker: worker.map(|w| w.id()),
            walkable_cells: worker.and_then(|w| w.layout()).map(|l| l.walkable.len()),
        })
    }

    /// A world position that pulls the level forward: the center of the lowest
    /// open slot's target, else of a recorded exit target of the observer's chunk.
    pub fn frontier_waypoint<S: PlacementSink>(manager: &StreamingManager<S>) -> Option<Vec3> {
        let graph = manager.graph();
        let target = graph
            .frontier()
            .iter()
            .map(|s| (s.origin, s.side))
            .min()
            .map(|(origin, side)| origin.neighbor(side))
            .or_else(|| {
                let current = graph.record(manager.current_coord()?)?;
                current
                    .exit_targets()
                    .map(|(_, t)| t)
                    .filter(|t| graph.is_recorded(*t))
                    .min()
            })?;
        let config = manager.config();
        let extent = config.chunk_extent();
        let offset = Vec3::new(extent / 2.0, config.block_size, extent / 2.0);
        Some(target.world_origin(extent) + offset)
    }

    /// Recorded coordinates in the order they were generated.
    pub fn creation_order<S: PlacementSink>(manager: &StreamingManager<S>) -> Vec<GridCoord> {
        let mut records: Vec<_> = manager.graph().records().collect();
        records.sort_by_key(|r| r.creation_index());
        records.into_iter().map(|r| r.coord()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelSummary {
    pub seed: u64,
    pub observer: Option<GridCoord>,
    pub records: usize,
    /// Records with more than one exit.
    pub forks: usize,
    pub next_index: u64,
    pub active: usize,
    pub open_slots: usize,
    pub pool_total: usize,
    pub pool_idle: usize,
    pub overflow_allocations: usize,
}

impl fmt::Display for LevelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let observer = self
            .observer
            .map_or_else(|| "-".to_string(), |c| c.to_string());
        write!(
            f,
            "Level: seed={} observer={} records={} forks={} next_index={} active={} open_slots={} pool={}/{} overflow={}",
            self.seed,
            observer,
            self.records,
            self.forks,
            self.next_index,
            self.active,
            self.open_slots,
            self.pool_total - self.pool_idle,
            self.pool_total,
            self.overflow_allocations,
        )
    }
}

/// One chunk's blueprint plus its materialization status.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkInfo {
    pub coord: GridCoord,
    pub origin: Vec3,
    pub seed: i32,
    pub entry: Side,
    pub exits: Vec<Side>,
    pub creation_index: u64,
    pub forked: bool,
    pub worker: Option<WorkerId>,
    pub walkable_cells: Option<usize>,
}

impl fmt::Display for ChunkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let exits: Vec<String> = self.exits.iter().map(|s| s.to_string()).collect();
        write!(
            f,
            "Chunk {} #{} seed={} entry={} exits=[{}] origin=({:.1}, {:.1}, {:.1})",
            self.coord,
            self.creation_index,
            self.seed,
            self.entry,
            exits.join(", "),
            self.origin.x,
            self.origin.y,
            self.origin.z,
        )?;
        if self.forked {
            write!(f, " fork")?;
        }
        match (self.worker, self.walkable_cells) {
            (Some(id), Some(cells)) => write!(f, " worker={id} walkable={cells}"),
            (Some(id), None) => write!(f, " worker={id}"),
            _ => write!(f, " inactive"),
        }
    }
}
