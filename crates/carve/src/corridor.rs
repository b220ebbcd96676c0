//! Biased random-walk corridor carving.
//!
//! A corridor runs entry anchor → turn midpoint → exit anchor. Each leg is walked
//! one orthogonal step at a time, preferring the step toward the leg's target and
//! falling back to a shuffled neighbour scan. A walk that runs out of attempts or
//! gets boxed in finishes with a straight x-then-z run to the target.

use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeSet;
use trailhead_common::CellPos;

use crate::anchor::in_interior;

/// Attempt ceiling for one leg of the biased walk.
pub const MAX_WALK_ATTEMPTS: usize = 2000;
/// Random interior probes when looking for a turn off a straight line.
pub const MAX_MIDPOINT_PROBES: usize = 100;
/// A walked cell touches at most this many already-carved cells: the one it
/// steps from and the leg's target.
pub const MAX_OCCUPIED_NEIGHBORS: usize = 2;

const STEPS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// How a leg of the walk reached its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegOutcome {
    Walked,
    /// No admissible step; finished by the straight-line fallback.
    Stuck,
    /// Attempt ceiling hit; finished by the straight-line fallback.
    Exhausted,
}

/// What one leg of the walk did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegTrace {
    pub from: CellPos,
    pub to: CellPos,
    pub outcome: LegOutcome,
    /// Steps taken by the biased walk.
    pub walked_steps: usize,
    /// Where the straight-line fallback took over, if it did.
    pub forced_from: Option<CellPos>,
    /// Cells laid by the straight-line fallback, in order.
    pub forced: Vec<CellPos>,
}

impl LegTrace {
    pub fn total_steps(&self) -> usize {
        self.walked_steps + self.forced.len()
    }
}

/// Carves corridors into a shared occupied set.
pub struct CorridorCarver<'a, R: Rng> {
    dim: usize,
    randomness_bias: f32,
    rng: &'a mut R,
    occupied: &'a mut BTreeSet<CellPos>,
}

impl<'a, R: Rng> CorridorCarver<'a, R> {
    pub fn new(
        dim: usize,
        randomness_bias: f32,
        rng: &'a mut R,
        occupied: &'a mut BTreeSet<CellPos>,
    ) -> Self {
        Self {
            dim,
            randomness_bias,
            rng,
            occupied,
        }
    }

    /// Carve from `entry` to `exit`, turning once through a midpoint when one exists.
    pub fn carve(&mut self, entry: CellPos, exit: CellPos) -> Vec<LegTrace> {
        match self.choose_midpoint(entry, exit) {
            Some(mid) => vec![self.walk_leg(entry, mid), self.walk_leg(mid, exit)],
            None => {
                tracing::warn!(%entry, %exit, "no turn midpoint found; carving direct");
                vec![self.walk_leg(entry, exit)]
            }
        }
    }

    /// Pick the corner the corridor turns at.
    pub fn choose_midpoint(&mut self, entry: CellPos, exit: CellPos) -> Option<CellPos> {
        let corners = [
            CellPos::new(entry.x, exit.z),
            CellPos::new(exit.x, entry.z),
        ];
        let usable = |p: &CellPos| in_interior(*p, self.dim) && *p != entry && *p != exit;

        if entry.x != exit.x && entry.z != exit.z {
            let valid: Vec<CellPos> = corners.iter().copied().filter(usable).collect();
            if !valid.is_empty() {
                return Some(valid[self.rng.random_range(0..valid.len())]);
            }
        }

        let valid: Vec<CellPos> = corners
            .iter()
            .copied()
            .filter(|p| usable(p) && breaks_line(entry, exit, *p))
            .collect();
        if !valid.is_empty() {
            return Some(valid[self.rng.random_range(0..valid.len())]);
        }

        let hi = self.dim as i32 - 2;
        for _ in 0..MAX_MIDPOINT_PROBES {
            let p = CellPos::new(self.rng.random_range(1..=hi), self.rng.random_range(1..=hi));
            if p != entry && p != exit && breaks_line(entry, exit, p) {
                return Some(p);
            }
        }
        None
    }

    /// Walk one leg from `from` to `to`.
    pub fn walk_leg(&mut self, from: CellPos, to: CellPos) -> LegTrace {
        self.occupied.insert(from);
        let mut trace = LegTrace {
            from,
            to,
            outcome: LegOutcome::Walked,
            walked_steps: 0,
            forced_from: None,
            forced: Vec::new(),
        };
        let mut current = from;
        let mut attempts = 0;
        while current != to {
            if attempts >= MAX_WALK_ATTEMPTS {
                tracing::warn!(%from, %to, attempts, "walk attempt ceiling hit; forcing completion");
                trace.outcome = LegOutcome::Exhausted;
                break;
            }
            attempts += 1;
            match self.next_step(current, to) {
                Some(next) => {
                    self.occupied.insert(next);
                    trace.walked_steps += 1;
                    current = next;
                }
                None => {
                    tracing::warn!(%from, %to, at = %current, "walk stuck; forcing completion");
                    trace.outcome = LegOutcome::Stuck;
                    break;
                }
            }
        }
        if current != to {
            trace.forced_from = Some(current);
            trace.forced = self.force_straight(current, to);
        }
        trace
    }

    fn next_step(&mut self, current: CellPos, target: CellPos) -> Option<CellPos> {
        let dx = (target.x - current.x).signum();
        let dz = (target.z - current.z).signum();
        let (sx, sz) = if dx != 0 && dz != 0 {
            if self.rng.random_bool(0.5) { (dx, 0) } else { (0, dz) }
        } else {
            (dx, dz)
        };

        let prefer_scan = self.rng.random::<f32>() < self.randomness_bias;
        if !prefer_scan {
            let biased = current.offset(sx, sz);
            if self.admissible(biased, current, target) {
                return Some(biased);
            }
        }

        let mut steps = STEPS;
        steps.shuffle(&mut *self.rng);
        steps
            .into_iter()
            .map(|(x, z)| current.offset(x, z))
            .find(|c| self.admissible(*c, current, target))
    }

    /// A step from `current` may touch no carved cell other than `current`
    /// and the leg target.
    fn admissible(&self, cell: CellPos, current: CellPos, target: CellPos) -> bool {
        if !in_interior(cell, self.dim) {
            return false;
        }
        if cell == target {
            return true;
        }
        if self.occupied.contains(&cell) {
            return false;
        }
        let touching: Vec<CellPos> = cell
            .neighbors()
            .into_iter()
            .filter(|n| self.occupied.contains(n))
            .collect();
        touching.len() <= MAX_OCCUPIED_NEIGHBORS
            && touching.iter().all(|n| *n == current || *n == target)
    }

    /// Step along x, then z, until the target is reached.
    fn force_straight(&mut self, mut current: CellPos, target: CellPos) -> Vec<CellPos> {
        let mut laid = Vec::with_capacity(current.manhattan(target) as usize);
        while current != target {
            current = if current.x != target.x {
                current.offset((target.x - current.x).signum(), 0)
            } else {
                current.offset(0, (target.z - current.z).signum())
            };
            self.occupied.insert(current);
            laid.push(current);
        }
        laid
    }
}

/// Whether `p` lies off the straight line through two collinear anchors.
pub fn breaks_line(a: CellPos, b: CellPos, p: CellPos) -> bool {
    if a.z == b.z && p.z == a.z {
        return false;
    }
    if a.x == b.x && p.x == a.x {
        return false;
    }
    true
}
