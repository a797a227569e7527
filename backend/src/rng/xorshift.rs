//! xorshift64* random number generator
//!
//! Fast, high-quality PRNG that is deterministic and suitable for
//! simulation purposes.
//!
//! # Determinism
//!
//! Same seed → same sequence. This is CRITICAL for:
//! - Idempotent re-runs (same dataset key reproduces the same decisions)
//! - Debugging (reproduce an exact simulation)
//! - Testing (verify behavior)
//!
//! Stream seeds are derived with [`stable_seed`] from
//! `(dataset key, company, stream name)` so each company-run owns an
//! independent, reproducible stream.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Derive a stable 64-bit seed from a dataset key, company name, and stream name.
///
/// Uses the first 8 bytes of `SHA-256("{dataset_key}:{company}:{stream}")`,
/// so the mapping is stable across runs, platforms, and process restarts.
///
/// # Example
/// ```
/// use inventory_seeder_core_rs::rng::stable_seed;
///
/// let a = stable_seed("2025-06-01_180d", "Rwanda", "moves");
/// let b = stable_seed("2025-06-01_180d", "Rwanda", "moves");
/// assert_eq!(a, b);
/// assert_ne!(a, stable_seed("2025-06-01_180d", "Kenya", "moves"));
/// ```
pub fn stable_seed(dataset_key: &str, company: &str, stream: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(dataset_key.as_bytes());
    hasher.update(b":");
    hasher.update(company.as_bytes());
    hasher.update(b":");
    hasher.update(stream.as_bytes());
    let digest = hasher.finalize();
    u64::from_be_bytes(digest[..8].try_into().unwrap())
}

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use inventory_seeder_core_rs::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let value = rng.next();
/// let qty = rng.uniform(150.0, 600.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    /// Internal state (64-bit)
    state: u64,
    /// Cached second sample from the last Box-Muller draw
    gauss_spare: Option<f64>,
}

impl RngManager {
    /// Create a new RNG with the given seed.
    ///
    /// A zero seed is mapped to 1 (xorshift requirement).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self {
            state,
            gauss_spare: None,
        }
    }

    /// Generate the next random u64, advancing the internal state.
    pub fn next(&mut self) -> u64 {
        // xorshift64* algorithm
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Random integer in `[min, max)`.
    ///
    /// # Panics
    /// Panics if `min >= max`.
    pub fn range(&mut self, min: i64, max: i64) -> i64 {
        assert!(min < max, "min must be less than max");
        let value = self.next();
        let range_size = (max - min) as u64;
        min + (value % range_size) as i64
    }

    /// Random integer in `[min, max]` (both inclusive).
    ///
    /// Mirrors the inclusive ranges the planning constants are written in,
    /// e.g. 2–6 shipments per month.
    pub fn range_inclusive(&mut self, min: i64, max: i64) -> i64 {
        self.range(min, max + 1)
    }

    /// Random f64 in `[0.0, 1.0)`.
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next();
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Random f64 in `[low, high)`.
    ///
    /// # Panics
    /// Panics if `low > high`.
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        assert!(low <= high, "low must not exceed high");
        low + (high - low) * self.next_f64()
    }

    /// Bernoulli trial: true with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Normally distributed f64 (Box-Muller, with spare caching).
    pub fn gauss(&mut self, mean: f64, stdev: f64) -> f64 {
        if let Some(z) = self.gauss_spare.take() {
            return mean + stdev * z;
        }
        // Rejection-free polar form would also work; the classic form is fine
        // since u1 is strictly below 1.0 and we guard against ln(0).
        let mut u1 = self.next_f64();
        if u1 <= f64::MIN_POSITIVE {
            u1 = f64::MIN_POSITIVE;
        }
        let u2 = self.next_f64();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * std::f64::consts::PI * u2;
        self.gauss_spare = Some(r * theta.sin());
        mean + stdev * r * theta.cos()
    }

    /// Index into a slice of length `len`.
    ///
    /// # Panics
    /// Panics if `len == 0`.
    pub fn index(&mut self, len: usize) -> usize {
        assert!(len > 0, "cannot choose from an empty collection");
        (self.next() % len as u64) as usize
    }

    /// Reference to a random element of `items`.
    ///
    /// # Panics
    /// Panics if `items` is empty.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.index(items.len())]
    }

    /// `k` distinct indices from `0..n`, in random order (partial Fisher-Yates).
    ///
    /// Returns fewer than `k` indices only when `k > n`.
    pub fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        let k = k.min(n);
        let mut pool: Vec<usize> = (0..n).collect();
        for i in 0..k {
            let j = i + self.index(n - i);
            pool.swap(i, j);
        }
        pool.truncate(k);
        pool
    }

    /// Sample `k` distinct elements (cloned) from `items` in random order.
    pub fn sample<T: Clone>(&mut self, items: &[T], k: usize) -> Vec<T> {
        self.sample_indices(items.len(), k)
            .into_iter()
            .map(|i| items[i].clone())
            .collect()
    }

    /// Shuffle a slice in place (Fisher-Yates).
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        if items.is_empty() {
            return;
        }
        for i in (1..items.len()).rev() {
            let j = self.index(i + 1);
            items.swap(i, j);
        }
    }

    /// Weighted choice over `(item, weight)` pairs.
    ///
    /// # Panics
    /// Panics if `choices` is empty or all weights are zero.
    pub fn weighted_choice<'a, T>(&mut self, choices: &'a [(T, f64)]) -> &'a T {
        let total: f64 = choices.iter().map(|(_, w)| w).sum();
        assert!(total > 0.0, "weighted_choice requires positive total weight");
        let mut target = self.next_f64() * total;
        for (item, w) in choices {
            target -= w;
            if target <= 0.0 {
                return item;
            }
        }
        &choices[choices.len() - 1].0
    }

    /// Current RNG state (for snapshotting/replay).
    pub fn get_state(&self) -> u64 {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seed_converted_to_nonzero() {
        let rng = RngManager::new(0);
        assert_ne!(rng.get_state(), 0, "Zero seed should be converted to 1");
    }

    #[test]
    #[should_panic(expected = "min must be less than max")]
    fn test_range_invalid_bounds() {
        let mut rng = RngManager::new(12345);
        rng.range(100, 50);
    }

    #[test]
    fn test_next_f64_in_range() {
        let mut rng = RngManager::new(12345);
        for _ in 0..1000 {
            let val = rng.next_f64();
            assert!(
                (0.0..1.0).contains(&val),
                "next_f64() produced value {} outside [0.0, 1.0)",
                val
            );
        }
    }

    #[test]
    fn test_uniform_bounds() {
        let mut rng = RngManager::new(77);
        for _ in 0..1000 {
            let v = rng.uniform(150.0, 600.0);
            assert!((150.0..600.0).contains(&v));
        }
    }

    #[test]
    fn test_sample_indices_distinct() {
        let mut rng = RngManager::new(9);
        for _ in 0..100 {
            let picked = rng.sample_indices(20, 7);
            assert_eq!(picked.len(), 7);
            let mut sorted = picked.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), 7, "sampled indices must be distinct");
        }
    }

    #[test]
    fn test_sample_indices_k_exceeds_n() {
        let mut rng = RngManager::new(9);
        let picked = rng.sample_indices(3, 10);
        assert_eq!(picked.len(), 3);
    }

    #[test]
    fn test_gauss_is_deterministic() {
        let mut a = RngManager::new(4242);
        let mut b = RngManager::new(4242);
        for _ in 0..50 {
            assert_eq!(a.gauss(10.0, 2.0), b.gauss(10.0, 2.0));
        }
    }

    #[test]
    fn test_stable_seed_is_stream_separated() {
        let base = stable_seed("key", "Rwanda", "moves");
        assert_eq!(base, stable_seed("key", "Rwanda", "moves"));
        assert_ne!(base, stable_seed("key", "Rwanda", "orders"));
        assert_ne!(base, stable_seed("key", "Uganda", "moves"));
        assert_ne!(base, stable_seed("other", "Rwanda", "moves"));
    }

    #[test]
    fn test_weighted_choice_respects_zero_weight() {
        let mut rng = RngManager::new(5);
        let choices = [("never", 0.0), ("always", 1.0)];
        for _ in 0..100 {
            assert_eq!(*rng.weighted_choice(&choices), "always");
        }
    }
}
