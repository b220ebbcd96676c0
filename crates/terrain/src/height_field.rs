use serde::{Deserialize, Serialize};
use trailhead_common::{CellPos, GridCoord};

use crate::HeightSource;

/// Errors from building a [`HeightField`] out of raw data.
#[derive(Debug, thiserror::Error)]
pub enum HeightFieldError {
    #[error("height field for a {dim}x{dim} chunk needs {expected} values, got {actual}")]
    SizeMismatch {
        dim: usize,
        expected: usize,
        actual: usize,
    },
}

/// Per-cell elevations of one chunk, stored row-major (`index = z * dim + x`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeightField {
    dim: usize,
    values: Vec<u32>,
}

impl HeightField {
    /// A field where every cell has the same elevation.
    pub fn flat(dim: usize, elevation: u32) -> Self {
        Self {
            dim,
            values: vec![elevation; dim * dim],
        }
    }

    pub fn from_values(dim: usize, values: Vec<u32>) -> Result<Self, HeightFieldError> {
        let expected = dim * dim;
        if values.len() != expected {
            return Err(HeightFieldError::SizeMismatch {
                dim,
                expected,
                actual: values.len(),
            });
        }
        Ok(Self { dim, values })
    }

    /// Sample a source over the cells of the chunk at `coord`.
    pub fn sample(source: &dyn HeightSource, coord: GridCoord, dim: usize) -> Self {
        let base_x = i64::from(coord.x) * dim as i64;
        let base_z = i64::from(coord.z) * dim as i64;
        let mut values = Vec::with_capacity(dim * dim);
        for z in 0..dim as i64 {
            for x in 0..dim as i64 {
                values.push(source.elevation(base_x + x, base_z + z));
            }
        }
        Self { dim, values }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Elevation at a chunk-local cell, `None` outside the chunk.
    pub fn get(&self, cell: CellPos) -> Option<u32> {
        self.index(cell).map(|i| self.values[i])
    }

    /// Elevation at a chunk-local cell, treating out-of-range cells as flat ground.
    pub fn at(&self, cell: CellPos) -> u32 {
        self.get(cell).unwrap_or(0)
    }

    pub fn set(&mut self, cell: CellPos, elevation: u32) -> bool {
        match self.index(cell) {
            Some(i) => {
                self.values[i] = elevation;
                true
            }
            None => false,
        }
    }

    pub fn max(&self) -> u32 {
        self.values.iter().copied().max().unwrap_or(0)
    }

    pub fn values(&self) -> &[u32] {
        &self.values
    }

    fn index(&self, cell: CellPos) -> Option<usize> {
        let dim = self.dim as i32;
        if cell.x < 0 || cell.z < 0 || cell.x >= dim || cell.z >= dim {
            return None;
        }
        Some(cell.z as usize * self.dim + cell.x as usize)
    }
}
