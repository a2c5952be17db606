//! Helpers to draw values from any [`Rng`].
//!
//! Every random decision of the simulation goes through these functions so
//! that a seeded generator replays the exact same run.

use rand_core::Rng;
use std::ops::RangeInclusive;

/// Uniform sample in `[0.0, 1.0)`.
pub(crate) fn unit<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let bits = rng.next_u64() >> 11;
    (bits as f64) * (1.0 / (1u64 << 53) as f64)
}

/// Returns `true` with the given probability.
pub(crate) fn chance<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    unit(rng) < probability
}

/// Uniform integer in the inclusive range.
pub(crate) fn within<R: Rng + ?Sized>(rng: &mut R, range: RangeInclusive<u64>) -> u64 {
    let (low, high) = range.into_inner();
    debug_assert!(low <= high);
    let span = high - low + 1;
    low + rng.next_u64() % span
}

/// Uniform index in `0..len`.
///
/// `len` must not be `0`.
pub(crate) fn index<R: Rng + ?Sized>(rng: &mut R, len: usize) -> usize {
    debug_assert!(len > 0);
    (rng.next_u64() % len as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaChaRng;
    use rand_core::SeedableRng as _;

    #[test]
    fn unit_stays_in_range() {
        let mut rng = ChaChaRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let sample = unit(&mut rng);
            assert!((0.0..1.0).contains(&sample));
        }
    }

    #[test]
    fn chance_extremes() {
        let mut rng = ChaChaRng::seed_from_u64(7);
        for _ in 0..1_000 {
            assert!(!chance(&mut rng, 0.0));
            assert!(chance(&mut rng, 1.0));
        }
    }

    #[test]
    fn within_covers_bounds() {
        let mut rng = ChaChaRng::seed_from_u64(3);
        let draws: Vec<u64> = (0..2_000).map(|_| within(&mut rng, 5..=8)).collect();
        assert!(draws.iter().all(|d| (5..=8).contains(d)));
        for expected in 5..=8 {
            assert!(draws.contains(&expected), "{expected} never drawn");
        }
    }

    #[test]
    fn index_is_uniform_enough() {
        let mut rng = ChaChaRng::seed_from_u64(11);
        let mut counts = [0usize; 4];
        for _ in 0..8_000 {
            counts[index(&mut rng, 4)] += 1;
        }
        for count in counts {
            assert!(count > 1_800 && count < 2_200, "count was {count}");
        }
    }
}
