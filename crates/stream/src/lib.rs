//! Streaming: level graph, chunk worker pool, observer-driven window updates.
//!
//! # Invariants
//! - At most one [`ChunkRecord`] per grid coordinate, never overwritten.
//! - A record re-entering the window is materialized from the record alone,
//!   so it looks exactly as it did the first time.
//! - Every live chunk's unresolved exit has exactly one connection slot; no
//!   slot points into a recorded chunk.
//! - Workers are recycled, never destroyed; idle and in-use sets are disjoint.
//! - The global RNG is advanced only when a chunk is created, in a fixed order, so a
//!   resumed level continues the same way an uninterrupted one would.

mod budget;
mod error;
mod fork;
mod graph;
mod manager;
mod pool;
mod record;
mod window;

pub use budget::{FrameTimer, StreamStats};
pub use error::StreamError;
pub use fork::{choose_exits, forks_at, pick_side};
pub use graph::{CellState, ConnectionSlot, FrontierIssue, LevelGraph};
pub use manager::{LevelState, StreamingManager};
pub use pool::{ChunkPool, ChunkWorker, SinkFactory, WorkerError, WorkerId};
pub use record::ChunkRecord;
pub use window::{diamond, in_diamond};

pub fn crate_info() -> &'static str {
    "trailhead-stream v0.1.0"
}
