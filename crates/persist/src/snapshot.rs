use serde::{Deserialize, Serialize};
use trailhead_stream::LevelState;

use crate::store::{StoreError, cbor_serialize, sha256_hex};

/// A saved level together with a hash of its encoded state.
///
/// The hash is sha256 over the CBOR encoding of `state`, so corruption that
/// survives decompression and decoding is still caught on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    pub state: LevelState,
    pub hash: String,
}

impl LevelSnapshot {
    pub fn capture(state: LevelState) -> Result<Self, StoreError> {
        let hash = content_hash(&state)?;
        Ok(Self { state, hash })
    }

    /// Recompute the hash and compare.
    pub fn verify(&self) -> bool {
        content_hash(&self.state).is_ok_and(|hash| hash == self.hash)
    }

    /// Number of chunk records in the snapshot.
    pub fn record_count(&self) -> usize {
        self.state.records.len()
    }
}

fn content_hash(state: &LevelState) -> Result<String, StoreError> {
    Ok(sha256_hex(&cbor_serialize(state)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailhead_carve::BlockGrid;
    use trailhead_common::LevelConfig;
    use trailhead_stream::StreamingManager;

    fn state(seed: u64) -> LevelState {
        let config = LevelConfig {
            chunk_dim: 7,
            window_size: 3,
            seed,
            ..LevelConfig::default()
        };
        StreamingManager::<BlockGrid>::new(config, Box::new(|| Ok(BlockGrid::new())))
            .unwrap()
            .save_state()
    }

    #[test]
    fn capture_and_verify() {
        let snap = LevelSnapshot::capture(state(42)).unwrap();
        assert!(snap.verify());
        assert_eq!(snap.hash.len(), 64);
        assert!(snap.record_count() >= 1);
    }

    #[test]
    fn tampering_is_detected() {
        let mut snap = LevelSnapshot::capture(state(42)).unwrap();
        snap.state.next_creation_index += 1;
        assert!(!snap.verify());
    }

    #[test]
    fn hash_depends_on_content() {
        let a = LevelSnapshot::capture(state(1)).unwrap();
        let b = LevelSnapshot::capture(state(2)).unwrap();
        let a_again = LevelSnapshot::capture(state(1)).unwrap();
        assert_ne!(a.hash, b.hash);
        assert_eq!(a.hash, a_again.hash);
    }
}
