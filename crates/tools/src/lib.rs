//! Developer tooling: level inspector, frontier audit, ASCII rendering.
//!
//! # Invariants
//! - Tools are read-only; nothing here mutates a level.

mod inspector;
mod render;

pub use inspector::{ChunkInfo, LevelInspector, LevelSummary};
pub use render::{render_blocks, render_layout, render_level_map};

pub fn crate_info() -> &'static str {
    "trailhead-tools v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("tools"));
    }
}
