use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors from loading or validating a [`LevelConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("window_size must be at most {max}, got {actual}")]
    WindowTooLarge { max: u32, actual: u32 },
    #[error("chunk_dim must be at least {min}, got {actual}")]
    ChunkTooSmall { min: usize, actual: usize },
    #[error("randomness_bias must lie in [0, 1], got {0}")]
    BiasOutOfRange(f32),
    #[error("block_size must be positive, got {0}")]
    BlockSize(f32),
    #[error("terrain frequency must be positive, got {0}")]
    Frequency(f64),
}

/// Smallest chunk that still leaves a carve-able interior around distinct anchors.
pub const MIN_CHUNK_DIM: usize = 5;

/// Largest accepted active window.
pub const MAX_WINDOW_SIZE: u32 = 255;

/// Height-field parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Noise frequency applied to global cell coordinates.
    pub frequency: f64,
    /// Elevations are clamped to `0..=max_elevation`.
    pub max_elevation: u32,
    /// Elevations above this raise blocks; at or below it the ground stays flat.
    pub flat_baseline: u32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            frequency: 0.08,
            max_elevation: 4,
            flat_baseline: 1,
        }
    }
}

/// Level generation and streaming configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Cells per chunk side. Odd values give a true center cell.
    pub chunk_dim: usize,
    /// Active window size; the window is a diamond of radius `window_size / 2`.
    pub window_size: u32,
    /// Every n-th synthesized chunk forks. Zero or negative disables forking.
    pub fork_frequency: i32,
    /// Global seed. Zero picks a random one at startup.
    pub seed: u64,
    /// Probability of skipping the biased walk step in favour of a random scan.
    pub randomness_bias: f32,
    /// World units per cell.
    pub block_size: f32,
    /// Pre-warmed pool size. `None` sizes the pool to the window.
    pub pool_capacity: Option<usize>,
    pub terrain: TerrainConfig,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            chunk_dim: 11,
            window_size: 5,
            fork_frequency: 4,
            seed: 0,
            randomness_bias: 0.25,
            block_size: 1.0,
            pool_capacity: None,
            terrain: TerrainConfig::default(),
        }
    }
}

impl LevelConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: LevelConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_dim < MIN_CHUNK_DIM {
            return Err(ConfigError::ChunkTooSmall {
                min: MIN_CHUNK_DIM,
                actual: self.chunk_dim,
            });
        }
        if self.window_size > MAX_WINDOW_SIZE {
            return Err(ConfigError::WindowTooLarge {
                max: MAX_WINDOW_SIZE,
                actual: self.window_size,
            });
        }
        if !(0.0..=1.0).contains(&self.randomness_bias) {
            return Err(ConfigError::BiasOutOfRange(self.randomness_bias));
        }
        if self.block_size.is_nan() || self.block_size <= 0.0 {
            return Err(ConfigError::BlockSize(self.block_size));
        }
        if self.terrain.frequency.is_nan() || self.terrain.frequency <= 0.0 {
            return Err(ConfigError::Frequency(self.terrain.frequency));
        }
        if self.chunk_dim % 2 == 0 {
            tracing::warn!(
                chunk_dim = self.chunk_dim,
                "even chunk dimension has no true center cell"
            );
        }
        Ok(())
    }

    /// Diamond radius of the active window.
    pub fn window_radius(&self) -> u32 {
        self.window_size / 2
    }

    /// World-space width of one chunk.
    pub fn chunk_extent(&self) -> f32 {
        self.chunk_dim as f32 * self.block_size
    }

    /// Number of chunks in a full active window.
    pub fn window_cell_count(&self) -> usize {
        let r = self.window_radius() as usize;
        2 * r * r + 2 * r + 1
    }

    pub fn effective_pool_capacity(&self) -> usize {
        self.pool_capacity
            .unwrap_or_else(|| self.window_cell_count())
    }

    /// The configured seed, or a fresh random one when the seed is zero.
    pub fn resolve_seed(&self) -> u64 {
        if self.seed != 0 {
            return self.seed;
        }
        let seed = loop {
            let candidate: u64 = rand::random();
            if candidate != 0 {
                break candidate;
            }
        };
        tracing::info!(seed, "no seed configured; generated one for this session");
        seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = LevelConfig::default();
        config.validate().unwrap();
        assert_eq!(config.window_radius(), 2);
        assert_eq!(config.window_cell_count(), 13);
        assert_eq!(config.effective_pool_capacity(), 13);
        assert_eq!(config.chunk_extent(), 11.0);
    }

    #[test]
    fn yaml_overrides_and_keeps_defaults() {
        let yaml = "chunk_dim: 9\nfork_frequency: 0\nterrain:\n  max_elevation: 7\n";
        let config = LevelConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.chunk_dim, 9);
        assert_eq!(config.fork_frequency, 0);
        assert_eq!(config.terrain.max_elevation, 7);
        assert_eq!(config.terrain.flat_baseline, 1);
        assert_eq!(config.window_size, 5);
    }

    #[test]
    fn tiny_chunks_are_rejected() {
        let config = LevelConfig {
            chunk_dim: 3,
            ..LevelConfig::default()
        };
        match config.validate() {
            Err(ConfigError::ChunkTooSmall { min, actual }) => {
                assert_eq!(min, MIN_CHUNK_DIM);
                assert_eq!(actual, 3);
            }
            other => panic!("expected ChunkTooSmall, got {other:?}"),
        }
    }

    #[test]
    fn oversized_window_is_rejected() {
        let config = LevelConfig {
            window_size: 200_000,
            ..LevelConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WindowTooLarge { max: MAX_WINDOW_SIZE, actual: 200_000 })
        ));

        let largest = LevelConfig {
            window_size: MAX_WINDOW_SIZE,
            ..LevelConfig::default()
        };
        largest.validate().unwrap();
        assert_eq!(largest.window_cell_count(), 2 * 127 * 127 + 2 * 127 + 1);
    }

    #[test]
    fn bias_outside_unit_interval_is_rejected() {
        let config = LevelConfig {
            randomness_bias: 1.5,
            ..LevelConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BiasOutOfRange(_))
        ));
    }

    #[test]
    fn explicit_seed_is_kept() {
        let config = LevelConfig {
            seed: 1234,
            ..LevelConfig::default()
        };
        assert_eq!(config.resolve_seed(), 1234);
    }

    #[test]
    fn zero_seed_resolves_to_nonzero() {
        assert_ne!(LevelConfig::default().resolve_seed(), 0);
    }
}
