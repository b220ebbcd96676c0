//! Persistence: content-hashed level snapshots and a file-backed level store.
//!
//! # Invariants
//! - Snapshots are content-addressed and verifiable.
//! - Every file the store writes is listed in a sha256 hash chain.
//! - Schema mismatches and integrity failures are fail-closed: nothing is loaded.

mod snapshot;
mod store;

pub use snapshot::LevelSnapshot;
pub use store::{IntegrityManifest, LEVEL_SCHEMA_VERSION, LevelMeta, LevelStore, ManifestEntry, StoreError};

pub fn crate_info() -> &'static str {
    "trailhead-persist v0.1.0"
}
