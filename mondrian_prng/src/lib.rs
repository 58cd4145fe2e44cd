// Seedable pseudo-random source for the Mondrian composition engine.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding.
// The generator is written out by hand rather than pulled from an RNG crate
// so that a given seed yields the same compositions on every platform and
// across dependency upgrades.
//
// One `MondrianRng` threads through both halves of the pipeline in
// `mondrian_core`: grammar expansion draws production alternatives from it,
// and the subdivision interpreter draws line widths, split ratios, retry
// gates and palette colors from the same stream. Nothing in the workspace
// reads ambient randomness.
//
// **Critical constraint: determinism.** The integer core must produce the
// same sequence for the same seed regardless of platform or optimization
// level. Floating-point values are derived from the integer stream only at
// the edges (`next_f64`, `range_f64`, `weighted_index`).

use serde::{Deserialize, Serialize};

/// Xoshiro256++ state. Cheap to clone; a clone continues the same stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MondrianRng {
    s: [u64; 4],
}

impl MondrianRng {
    /// Create a generator from a `u64` seed, expanded to 256 bits with
    /// SplitMix64. Equal seeds give equal streams.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Next raw `u64` of the stream.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Uniform `f64` in [0, 1), built from the upper 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform `f64` in `[low, high)`. A degenerate range `low == high`
    /// returns `low` (still consuming one draw, so the stream position does
    /// not depend on whether a range happens to be fixed).
    ///
    /// Panics if `low > high`.
    pub fn range_f64(&mut self, low: f64, high: f64) -> f64 {
        assert!(low <= high, "range_f64: low must not exceed high");
        low + self.next_f64() * (high - low)
    }

    /// Uniform integer in `[low, high)` with rejection sampling.
    ///
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Uniform `usize` in `[low, high)`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// `true` with probability `p`. `p <= 0.0` is always false and
    /// `p >= 1.0` always true.
    pub fn random_bool(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick an index with probability proportional to `weights[i]`.
    ///
    /// Non-positive and non-finite weights never win. Returns `None` when
    /// no weight is positive, without consuming a draw.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let usable = |w: f64| w.is_finite() && w > 0.0;
        let total: f64 = weights.iter().copied().filter(|&w| usable(w)).sum();
        if total <= 0.0 {
            return None;
        }

        let target = self.next_f64() * total;
        let mut cumulative = 0.0;
        let mut last_usable = None;
        for (i, &w) in weights.iter().enumerate() {
            if !usable(w) {
                continue;
            }
            cumulative += w;
            last_usable = Some(i);
            if target < cumulative {
                return Some(i);
            }
        }
        // Rounding can leave `target` a hair above the final cumulative sum.
        last_usable
    }

    /// `k` distinct indices from `0..len` in draw order (partial
    /// Fisher-Yates). `k` is clamped to `len`.
    pub fn sample_indices(&mut self, len: usize, k: usize) -> Vec<usize> {
        let k = k.min(len);
        let mut pool: Vec<usize> = (0..len).collect();
        for i in 0..k {
            let j = self.range_usize(i, len);
            pool.swap(i, j);
        }
        pool.truncate(k);
        pool
    }
}

/// SplitMix64 step, used only to expand the seed.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = MondrianRng::new(42);
        let mut b = MondrianRng::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = MondrianRng::new(42);
        let mut b = MondrianRng::new(43);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn f64_in_unit_range() {
        let mut rng = MondrianRng::new(12345);
        for _ in 0..10_000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v), "f64 out of range: {v}");
        }
    }

    #[test]
    fn range_f64_within_bounds() {
        let mut rng = MondrianRng::new(777);
        for _ in 0..10_000 {
            let v = rng.range_f64(0.008, 0.012);
            assert!((0.008..0.012).contains(&v), "range_f64 out of range: {v}");
        }
    }

    #[test]
    fn range_f64_degenerate_returns_low_and_advances() {
        let mut rng = MondrianRng::new(5);
        let mut reference = MondrianRng::new(5);
        assert_eq!(rng.range_f64(0.1, 0.1), 0.1);
        reference.next_u64();
        assert_eq!(rng, reference);
    }

    #[test]
    fn range_usize_within_bounds() {
        let mut rng = MondrianRng::new(555);
        for _ in 0..10_000 {
            let v = rng.range_usize(5, 15);
            assert!((5..15).contains(&v), "range_usize out of range: {v}");
        }
    }

    #[test]
    fn random_bool_extremes() {
        let mut rng = MondrianRng::new(42);
        for _ in 0..100 {
            assert!(!rng.random_bool(0.0));
            assert!(rng.random_bool(1.0));
        }
    }

    #[test]
    fn weighted_index_follows_weights() {
        let mut rng = MondrianRng::new(9);
        let weights = [50.0, 0.0, 150.0];
        let mut counts = [0usize; 3];
        let n = 20_000;
        for _ in 0..n {
            counts[rng.weighted_index(&weights).unwrap()] += 1;
        }
        assert_eq!(counts[1], 0, "zero weight must never be drawn");
        let share = counts[2] as f64 / n as f64;
        assert!(
            (0.72..0.78).contains(&share),
            "expected ~75% for the 150 weight, got {:.1}%",
            share * 100.0
        );
    }

    #[test]
    fn weighted_index_without_positive_weight_is_none() {
        let mut rng = MondrianRng::new(1);
        let before = rng.clone();
        assert_eq!(rng.weighted_index(&[]), None);
        assert_eq!(rng.weighted_index(&[0.0, -2.0, f64::NAN]), None);
        assert_eq!(rng, before, "no draw should be consumed");
    }

    #[test]
    fn sample_indices_are_distinct() {
        let mut rng = MondrianRng::new(31);
        for _ in 0..200 {
            let mut picked = rng.sample_indices(3, 2);
            assert_eq!(picked.len(), 2);
            picked.sort_unstable();
            picked.dedup();
            assert_eq!(picked.len(), 2);
            assert!(picked.iter().all(|&i| i < 3));
        }
        assert_eq!(rng.sample_indices(2, 5).len(), 2);
        assert!(rng.sample_indices(0, 3).is_empty());
    }

    #[test]
    fn serialization_roundtrip_continues_stream() {
        let mut rng = MondrianRng::new(42);
        for _ in 0..100 {
            rng.next_u64();
        }
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: MondrianRng = serde_json::from_str(&json).unwrap();
        for _ in 0..100 {
            assert_eq!(rng.next_u64(), restored.next_u64());
        }
    }
}
