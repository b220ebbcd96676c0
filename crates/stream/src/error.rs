use trailhead_common::{ConfigError, GridCoord};

use crate::pool::{WorkerError, WorkerId};

/// Errors surfaced by the streaming manager.
///
/// Recoverable conditions (pool overflow, stuck walks, frontier anomalies) are
/// logged and never reach the caller.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("invalid level configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("no chunk worker available: {0}")]
    WorkerUnavailable(#[from] WorkerError),
    #[error("observer position {0:?} lies outside the level grid")]
    ObserverOutOfRange(glam::Vec3),
    #[error("chunk {0} already has a record")]
    CoordinateCollision(GridCoord),
    #[error("worker {0} is not managed by this pool")]
    UnknownWorker(WorkerId),
    #[error("saved level is inconsistent: {0}")]
    InvalidState(String),
}
