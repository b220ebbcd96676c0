//! Shared types for the trailhead level generator: lattice coordinates, chunk sides,
//! chunk-local cells and the level configuration.

mod config;
mod types;

pub use config::{ConfigError, LevelConfig, MAX_WINDOW_SIZE, MIN_CHUNK_DIM, TerrainConfig};
pub use types::{CellPos, GRID_LIMIT, GridCoord, Side};

pub fn crate_info() -> &'static str {
    "trailhead-common v0.1.0"
}
