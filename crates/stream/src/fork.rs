use rand::Rng;
use trailhead_common::Side;

/// Whether the chunk with this creation index gets a second exit.
pub fn forks_at(creation_index: u64, fork_frequency: i32) -> bool {
    fork_frequency > 0 && creation_index > 0 && creation_index % fork_frequency as u64 == 0
}

/// Uniform random cardinal side not in `taken`.
pub fn pick_side<R: Rng>(rng: &mut R, taken: &[Side]) -> Option<Side> {
    let candidates: Vec<Side> = Side::CARDINAL
        .into_iter()
        .filter(|s| !taken.contains(s))
        .collect();
    if candidates.is_empty() {
        return None;
    }
    Some(candidates[rng.random_range(0..candidates.len())])
}

/// Decide the exits of a freshly synthesized chunk.
///
/// A primary exit away from the entry, plus a fork on every `fork_frequency`-th
/// chunk. Never returns an empty list.
pub fn choose_exits<R: Rng>(
    rng: &mut R,
    entry: Side,
    creation_index: u64,
    fork_frequency: i32,
) -> Vec<Side> {
    let mut exits = Vec::with_capacity(2);
    exits.extend(pick_side(rng, &[entry]));

    if forks_at(creation_index, fork_frequency) {
        let mut taken = vec![entry];
        taken.extend_from_slice(&exits);
        match pick_side(rng, &taken) {
            Some(fork) => exits.push(fork),
            None => tracing::warn!(%entry, creation_index, "no side left for a fork"),
        }
    }

    if exits.is_empty() {
        tracing::warn!(%entry, creation_index, "no exit resolved; forcing one");
        exits.extend(Side::CARDINAL.into_iter().find(|s| *s != entry));
    }
    exits
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn fork_cadence() {
        let forks: Vec<u64> = (0..10).filter(|i| forks_at(*i, 3)).collect();
        assert_eq!(forks, vec![3, 6, 9]);
        assert!(!(0..100).any(|i| forks_at(i, 0)));
        assert!(!(0..100).any(|i| forks_at(i, -2)));
        assert!(forks_at(1, 1));
    }

    #[test]
    fn exits_avoid_entry_and_each_other() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        for i in 1..200 {
            for entry in Side::CARDINAL {
                let exits = choose_exits(&mut rng, entry, i, 2);
                assert!(!exits.contains(&entry));
                assert_eq!(exits.len(), if i % 2 == 0 { 2 } else { 1 });
                if exits.len() == 2 {
                    assert_ne!(exits[0], exits[1]);
                }
            }
        }
    }

    #[test]
    fn pick_side_respects_exclusions() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(pick_side(&mut rng, &Side::CARDINAL), None);
        assert_eq!(
            pick_side(&mut rng, &[Side::North, Side::South, Side::East]),
            Some(Side::West)
        );
    }

    #[test]
    fn every_side_gets_picked() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.extend(pick_side(&mut rng, &[Side::Center]));
        }
        assert_eq!(seen.len(), 4);
    }
}
