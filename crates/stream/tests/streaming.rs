use std::collections::BTreeSet;

use glam::Vec3;
use trailhead_carve::{BlockGrid, anchor_point, border_point};
use trailhead_common::{GridCoord, LevelConfig, Side};
use trailhead_stream::{StreamingManager, diamond};

fn config(window_size: u32, fork_frequency: i32) -> LevelConfig {
    LevelConfig {
        chunk_dim: 11,
        window_size,
        fork_frequency,
        seed: 90_210,
        ..LevelConfig::default()
    }
}

fn build(config: LevelConfig) -> StreamingManager<BlockGrid> {
    StreamingManager::new(config, Box::new(|| Ok(BlockGrid::new()))).unwrap()
}

/// Move the observer onto the lowest open slot's target so the level keeps
/// growing. With no open slot, follow a recorded exit or drift east.
fn step(manager: &mut StreamingManager<BlockGrid>) {
    let current = manager.current_coord().unwrap();
    let frontier_target = manager
        .graph()
        .frontier()
        .iter()
        .map(|s| (s.origin, s.side))
        .min()
        .map(|(origin, side)| origin.neighbor(side));
    let next = frontier_target
        .or_else(|| {
            manager.graph().record(current).and_then(|r| {
                r.exit_targets()
                    .map(|(_, t)| t)
                    .filter(|t| manager.graph().is_recorded(*t))
                    .min()
            })
        })
        .unwrap_or_else(|| current.neighbor(Side::East));
    let extent = manager.config().chunk_extent();
    let position = next.world_origin(extent) + Vec3::new(extent / 2.0, 1.0, extent / 2.0);
    manager.on_observer_moved(position).unwrap();
}

#[test]
fn active_window_stays_inside_the_diamond() {
    let mut m = build(config(3, 4));
    for _ in 0..30 {
        step(&mut m);
        let center = m.current_coord().unwrap();
        let window: BTreeSet<GridCoord> = diamond(center, 1).into_iter().collect();
        for coord in m.active_coords() {
            assert!(window.contains(&coord), "{coord} outside window around {center}");
        }
        assert!(m.is_active(center) || !m.graph().is_recorded(center));
    }
}

#[test]
fn revisited_chunks_are_replayed_identically() {
    let mut m = build(config(5, 3));
    let origin_layout = m.worker_at(GridCoord::ORIGIN).unwrap().layout().cloned();
    let origin_blocks = m.worker_at(GridCoord::ORIGIN).unwrap().sink().clone();
    let records_before = m.graph().record_count();

    m.on_observer_moved(Vec3::new(5_000.0, 0.0, 5_000.0)).unwrap();
    assert!(!m.is_active(GridCoord::ORIGIN));
    assert!(m.graph().is_recorded(GridCoord::ORIGIN));

    m.on_observer_moved(m.spawn_point()).unwrap();
    let worker = m.worker_at(GridCoord::ORIGIN).unwrap();
    assert_eq!(worker.layout().cloned(), origin_layout);
    assert_eq!(worker.sink(), &origin_blocks);
    assert_eq!(m.graph().record_count(), records_before);
    assert_eq!(m.stats().chunks_synthesized, 0);
}

#[test]
fn frontier_stays_closed_while_walking() {
    for fork_frequency in [0, 2, 5] {
        let mut m = build(config(7, fork_frequency));
        for i in 0..40 {
            step(&mut m);
            let issues = m.audit_frontier();
            assert!(issues.is_empty(), "step {i}: {issues:?}");
            for slot in m.graph().frontier() {
                assert!(!m.graph().is_recorded(slot.target()));
                assert!(m.is_active(slot.origin));
            }
        }
    }
}

#[test]
fn fork_cadence_follows_creation_index() {
    let mut m = build(config(7, 3));
    for _ in 0..25 {
        step(&mut m);
    }
    assert!(m.graph().record_count() > 10);
    for record in m.graph().records() {
        let index = record.creation_index();
        let expected = if index > 0 && index % 3 == 0 { 2 } else { 1 };
        assert_eq!(record.exits().len(), expected, "index {index}");
        assert!(!record.exits().contains(&record.entry()));
    }
}

#[test]
fn slot_of_a_released_chunk_still_feeds_the_new_window() {
    let mut m = build(config(3, 0));
    // The origin's neighbour has an open exit pointing two steps out.
    let slot = m
        .graph()
        .frontier()
        .iter()
        .copied()
        .find(|s| s.origin != GridCoord::ORIGIN)
        .unwrap();
    let target = slot.target();
    assert!(!m.graph().is_recorded(target));

    // Stand next to the target, far enough that the slot's owner leaves the window.
    let center = Side::CARDINAL
        .into_iter()
        .map(|side| target.neighbor(side))
        .find(|c| c.manhattan(slot.origin) == 2)
        .unwrap();
    let extent = m.config().chunk_extent();
    let position = center.world_origin(extent) + Vec3::new(extent / 2.0, 1.0, extent / 2.0);
    m.on_observer_moved(position).unwrap();

    assert!(!m.is_active(slot.origin));
    assert!(m.graph().is_recorded(target));
    assert!(m.is_active(target));
    assert_eq!(m.graph().record(target).unwrap().entry(), slot.side.opposite());
    assert!(m.stats().chunks_synthesized >= 1);
    assert!(m.audit_frontier().is_empty());
}

#[test]
fn creation_indices_are_unique_and_dense() {
    let mut m = build(config(5, 4));
    for _ in 0..20 {
        step(&mut m);
    }
    let indices: BTreeSet<u64> = m.graph().records().map(|r| r.creation_index()).collect();
    assert_eq!(indices.len(), m.graph().record_count());
    assert!(indices.iter().all(|i| *i < m.graph().next_index()));
}

#[test]
fn pool_partition_is_disjoint() {
    let mut m = build(config(5, 2));
    for _ in 0..25 {
        step(&mut m);
        let pool = m.pool();
        let free: BTreeSet<_> = pool.free_ids().iter().copied().collect();
        assert_eq!(free.len(), pool.free_ids().len());
        for worker in pool.workers() {
            assert_eq!(worker.is_in_use(), !free.contains(&worker.id()));
        }
        assert_eq!(pool.in_use(), m.active_count());
    }
}

#[test]
fn small_pool_overflows_instead_of_failing() {
    let mut m = build(LevelConfig {
        pool_capacity: Some(1),
        ..config(7, 2)
    });
    for _ in 0..5 {
        step(&mut m);
    }
    assert!(m.active_count() > 1);
    assert!(m.pool().overflow_allocations() > 0);
}

#[test]
fn neighbouring_chunks_meet_at_their_borders() {
    let mut m = build(config(7, 3));
    for _ in 0..10 {
        step(&mut m);
    }
    let dim = m.config().chunk_dim;
    for coord in m.active_coords().collect::<Vec<_>>() {
        let record = m.graph().record(coord).unwrap();
        if record.entry().is_center() {
            continue;
        }
        let worker = m.worker_at(coord).unwrap();
        assert!(worker.sink().is_open(border_point(record.entry(), dim)));
        assert!(worker.sink().is_open(anchor_point(record.entry(), dim)));

        let parent = coord.neighbor(record.entry());
        if let Some(parent_worker) = m.worker_at(parent) {
            let parent_record = m.graph().record(parent).unwrap();
            if parent_record.exits().contains(&record.entry().opposite()) {
                let layout = parent_worker.layout().unwrap();
                assert!(layout.is_walkable(border_point(record.entry().opposite(), dim)));
            }
        }
    }
}

#[test]
fn resumed_level_matches_uninterrupted_session() {
    let mut uninterrupted = build(config(5, 3));
    for _ in 0..12 {
        step(&mut uninterrupted);
    }
    let saved = uninterrupted.save_state();
    for _ in 0..15 {
        step(&mut uninterrupted);
    }

    let mut resumed =
        StreamingManager::<BlockGrid>::resume(saved.clone(), Box::new(|| Ok(BlockGrid::new()))).unwrap();
    assert_eq!(resumed.graph().record_count(), saved.records.len());
    assert_eq!(resumed.current_coord(), saved.observer);
    for _ in 0..15 {
        step(&mut resumed);
    }

    assert_eq!(resumed.save_state(), uninterrupted.save_state());
}

#[test]
fn resume_rejects_mismatched_height_fields() {
    let m = build(config(5, 3));
    let mut state = m.save_state();
    state.config.chunk_dim = 9;
    let result = StreamingManager::<BlockGrid>::resume(state, Box::new(|| Ok(BlockGrid::new())));
    assert!(result.is_err());
}

#[test]
fn same_seed_builds_the_same_level() {
    let mut a = build(config(5, 3));
    let mut b = build(config(5, 3));
    for _ in 0..10 {
        step(&mut a);
        step(&mut b);
    }
    assert_eq!(a.save_state(), b.save_state());
}
