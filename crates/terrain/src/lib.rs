//! Terrain: height-field sources and per-chunk elevation buffers.
//!
//! # Invariants
//! - A source is a pure function of the global cell coordinate.
//! - Elevations are non-negative and never exceed the configured clamp.

mod height_field;

pub use height_field::{HeightField, HeightFieldError};

use noise::{NoiseFn, Perlin};
use trailhead_common::TerrainConfig;

/// Maps a global cell coordinate to an elevation.
pub trait HeightSource {
    fn elevation(&self, global_x: i64, global_z: i64) -> u32;
}

/// Perlin-noise elevations, scaled into `0..=max_elevation`.
#[derive(Debug, Clone)]
pub struct NoiseHeightSource {
    perlin: Perlin,
    frequency: f64,
    max_elevation: u32,
}

impl NoiseHeightSource {
    pub fn new(seed: u32, frequency: f64, max_elevation: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            frequency,
            max_elevation,
        }
    }

    /// Build from the terrain section of a level config, keyed to the level seed.
    pub fn from_config(config: &TerrainConfig, level_seed: u64) -> Self {
        // High half folded into the low half.
        let folded = (level_seed ^ (level_seed >> 32)) as u32;
        Self::new(folded, config.frequency, config.max_elevation)
    }
}

impl HeightSource for NoiseHeightSource {
    fn elevation(&self, global_x: i64, global_z: i64) -> u32 {
        let n = self.perlin.get([
            global_x as f64 * self.frequency,
            global_z as f64 * self.frequency,
        ]);
        let unit = ((n + 1.0) * 0.5).clamp(0.0, 1.0);
        let scaled = (unit * f64::from(self.max_elevation.saturating_add(1))).floor() as u32;
        scaled.min(self.max_elevation)
    }
}

/// Constant elevation everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatHeightSource {
    elevation: u32,
}

impl FlatHeightSource {
    pub fn new(elevation: u32) -> Self {
        Self { elevation }
    }
}

impl HeightSource for FlatHeightSource {
    fn elevation(&self, _global_x: i64, _global_z: i64) -> u32 {
        self.elevation
    }
}

pub fn crate_info() -> &'static str {
    "trailhead-terrain v0.1.0"
}
