use rand::Rng;
use rand::seq::index;

/// Randomness seam for the backfill generator. Production uses the thread
/// RNG; tests substitute a seeded source so placements are reproducible.
pub trait RandomSource {
    /// `k` distinct indices drawn uniformly from `0..len`, `k <= len`.
    fn sample_indices(&mut self, len: usize, k: usize) -> Vec<usize>;

    /// Uniform minute in the inclusive range `[lo, hi]`.
    fn minute_in(&mut self, lo: u32, hi: u32) -> u32;
}

/// Default source backed by `rand::thread_rng`.
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn sample_indices(&mut self, len: usize, k: usize) -> Vec<usize> {
        index::sample(&mut rand::thread_rng(), len, k).into_vec()
    }

    fn minute_in(&mut self, lo: u32, hi: u32) -> u32 {
        rand::thread_rng().gen_range(lo..=hi)
    }
}

/// Seeded source for deterministic tests.
pub struct SeededRandom(rand::rngs::StdRng);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        use rand::SeedableRng;
        Self(rand::rngs::StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for SeededRandom {
    fn sample_indices(&mut self, len: usize, k: usize) -> Vec<usize> {
        index::sample(&mut self.0, len, k).into_vec()
    }

    fn minute_in(&mut self, lo: u32, hi: u32) -> u32 {
        self.0.gen_range(lo..=hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampled_indices_are_distinct_and_in_range() {
        let mut rng = SeededRandom::new(7);
        for _ in 0..50 {
            let picked = rng.sample_indices(10, 6);
            assert_eq!(picked.len(), 6);
            let mut sorted = picked.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), 6);
            assert!(picked.iter().all(|&i| i < 10));
        }
    }

    #[test]
    fn full_sample_covers_everything() {
        let mut rng = SeededRandom::new(1);
        let mut picked = rng.sample_indices(5, 5);
        picked.sort_unstable();
        assert_eq!(picked, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn minute_in_respects_inclusive_bounds() {
        let mut rng = SeededRandom::new(3);
        for _ in 0..200 {
            let m = rng.minute_in(540, 960);
            assert!((540..=960).contains(&m));
        }
        // degenerate range has a single possible value
        assert_eq!(rng.minute_in(540, 540), 540);
    }
}
