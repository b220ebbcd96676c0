use glam::Vec3;
use std::fmt;
use trailhead_carve::{BlockPlan, ChunkLayout, PlacementSink};
use trailhead_common::GridCoord;

/// Index of a worker inside its pool. Stable for the pool's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub usize);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A worker instance that cannot hold chunk content.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WorkerError {
    #[error("chunk worker is missing its generator component: {0}")]
    MissingGenerator(String),
}

/// Builds the placement sink behind each worker.
pub type SinkFactory<S> = Box<dyn FnMut() -> Result<S, WorkerError>>;

/// Reusable holder of one chunk's content.
#[derive(Debug)]
pub struct ChunkWorker<S> {
    id: WorkerId,
    in_use: bool,
    binding: Option<GridCoord>,
    layout: Option<ChunkLayout>,
    sink: S,
}

impl<S: PlacementSink> ChunkWorker<S> {
    fn new(id: WorkerId, sink: S) -> Self {
        Self {
            id,
            in_use: false,
            binding: None,
            layout: None,
            sink,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn is_in_use(&self) -> bool {
        self.in_use
    }

    /// Coordinate this worker currently materializes.
    pub fn binding(&self) -> Option<GridCoord> {
        self.binding
    }

    pub fn layout(&self) -> Option<&ChunkLayout> {
        self.layout.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Place a chunk's content and bind the worker to its coordinate.
    pub fn materialize(&mut self, coord: GridCoord, origin: Vec3, layout: ChunkLayout, plan: &BlockPlan) {
        self.sink.reset();
        self.sink.set_origin(origin);
        plan.apply(&mut self.sink);
        self.binding = Some(coord);
        self.layout = Some(layout);
    }

    fn clear(&mut self) {
        self.sink.reset();
        self.binding = None;
        self.layout = None;
        self.in_use = false;
    }
}

/// Fixed set of chunk workers recycled as chunks stream in and out.
///
/// Workers are never destroyed; the pool only grows when it runs dry.
pub struct ChunkPool<S> {
    workers: Vec<ChunkWorker<S>>,
    free: Vec<WorkerId>,
    factory: SinkFactory<S>,
    overflow_allocations: usize,
    discarded: usize,
}

impl<S: PlacementSink> ChunkPool<S> {
    /// Pre-warm `capacity` workers. Instances the factory fails to build are
    /// discarded and logged.
    pub fn new(mut factory: SinkFactory<S>, capacity: usize) -> Self {
        let mut workers = Vec::with_capacity(capacity);
        let mut discarded = 0;
        for _ in 0..capacity {
            match factory() {
                Ok(sink) => {
                    let id = WorkerId(workers.len());
                    workers.push(ChunkWorker::new(id, sink));
                }
                Err(e) => {
                    tracing::error!(error = %e, "discarding malformed chunk worker");
                    discarded += 1;
                }
            }
        }
        let free = workers.iter().rev().map(|w| w.id).collect();
        Self {
            workers,
            free,
            factory,
            overflow_allocations: 0,
            discarded,
        }
    }

    /// Take an idle worker, growing the pool if none are left.
    pub fn acquire(&mut self) -> Result<WorkerId, WorkerError> {
        if let Some(id) = self.free.pop() {
            self.workers[id.0].in_use = true;
            return Ok(id);
        }

        tracing::warn!(
            total = self.workers.len(),
            "chunk pool exhausted; allocating overflow worker"
        );
        match (self.factory)() {
            Ok(sink) => {
                let id = WorkerId(self.workers.len());
                let mut worker = ChunkWorker::new(id, sink);
                worker.in_use = true;
                self.workers.push(worker);
                self.overflow_allocations += 1;
                Ok(id)
            }
            Err(e) => {
                tracing::error!(error = %e, "discarding malformed overflow worker");
                self.discarded += 1;
                Err(e)
            }
        }
    }

    /// Return a worker to the idle set. Releasing an idle worker does nothing.
    pub fn release(&mut self, id: WorkerId) -> bool {
        let Some(worker) = self.workers.get_mut(id.0) else {
            return false;
        };
        if !worker.in_use {
            return false;
        }
        worker.clear();
        self.free.push(id);
        true
    }

    pub fn worker(&self, id: WorkerId) -> Option<&ChunkWorker<S>> {
        self.workers.get(id.0)
    }

    pub fn worker_mut(&mut self, id: WorkerId) -> Option<&mut ChunkWorker<S>> {
        self.workers.get_mut(id.0)
    }

    /// Whether `id` is live and materializing `coord`.
    pub fn is_bound_to(&self, id: WorkerId, coord: GridCoord) -> bool {
        self.worker(id)
            .is_some_and(|w| w.in_use && w.binding == Some(coord))
    }

    pub fn workers(&self) -> impl Iterator<Item = &ChunkWorker<S>> {
        self.workers.iter()
    }

    pub fn free_ids(&self) -> &[WorkerId] {
        &self.free
    }

    pub fn total(&self) -> usize {
        self.workers.len()
    }

    pub fn idle(&self) -> usize {
        self.free.len()
    }

    pub fn in_use(&self) -> usize {
        self.workers.len() - self.free.len()
    }

    pub fn overflow_allocations(&self) -> usize {
        self.overflow_allocations
    }

    pub fn discarded(&self) -> usize {
        self.discarded
    }
}
