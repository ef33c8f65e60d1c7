//! Approximate membership set ("seen URL" check) with no false negatives.
//!
//! Sized to roughly 10x the expected URL count, using a double-hashing
//! scheme (`g_i(x) = h1(x) + i * h2(x)`) over one strong base hash rather
//! than `k` independently salted weak hashes, to keep bit independence high.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

const DEFAULT_HASH_COUNT: u32 = 5;

/// A fixed-size bit vector backing the bloom filter, addressable by bit index.
struct BitVec {
    bits: Vec<AtomicU64>,
    len: u64,
}

impl BitVec {
    fn new(len: u64) -> Self {
        let words = (len / 64 + 1) as usize;
        Self {
            bits: (0..words).map(|_| AtomicU64::new(0)).collect(),
            len,
        }
    }

    fn set(&self, index: u64) {
        let index = index % self.len;
        let word = (index / 64) as usize;
        let bit = index % 64;
        self.bits[word].fetch_or(1 << bit, Ordering::Relaxed);
    }

    fn get(&self, index: u64) -> bool {
        let index = index % self.len;
        let word = (index / 64) as usize;
        let bit = index % 64;
        (self.bits[word].load(Ordering::Relaxed) & (1 << bit)) != 0
    }
}

/// Probabilistic "seen URL" set: no false negatives, rare false positives.
///
/// `contains(u) == false` guarantees `u` was never added. A `true` result
/// may occasionally be wrong; that costs coverage, never correctness of the
/// frontier's no-duplicate-dispatch invariant.
pub struct BloomFilter {
    bits: BitVec,
    hash_count: u32,
    inserted: AtomicU64,
}

impl BloomFilter {
    /// Creates a filter sized for `expected_items`, at roughly 10x capacity.
    pub fn new(expected_items: usize) -> Self {
        Self::with_params(expected_items, DEFAULT_HASH_COUNT)
    }

    fn with_params(expected_items: usize, hash_count: u32) -> Self {
        let capacity = (expected_items.max(1) as u64) * 10;
        Self {
            bits: BitVec::new(capacity),
            hash_count,
            inserted: AtomicU64::new(0),
        }
    }

    /// Adds a string to the set, setting its `k` bits.
    pub fn add(&self, value: &str) {
        let (h1, h2) = Self::base_hashes(value);
        for i in 0..self.hash_count {
            let index = h1.wrapping_add((i as u64).wrapping_mul(h2));
            self.bits.set(index);
        }
        self.inserted.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns true if all `k` bits for `value` are set. May be a false
    /// positive; never a false negative for a previously-added value.
    pub fn contains(&self, value: &str) -> bool {
        let (h1, h2) = Self::base_hashes(value);
        for i in 0..self.hash_count {
            let index = h1.wrapping_add((i as u64).wrapping_mul(h2));
            if !self.bits.get(index) {
                return false;
            }
        }
        true
    }

    /// Number of `add` calls made so far (exact, independent of bit overlap).
    pub fn inserted_count(&self) -> u64 {
        self.inserted.load(Ordering::Relaxed)
    }

    fn base_hashes(value: &str) -> (u64, u64) {
        let mut h1 = DefaultHasher::new();
        value.hash(&mut h1);
        let h1 = h1.finish();

        let mut h2 = DefaultHasher::new();
        (value, 0x9e3779b97f4a7c15u64).hash(&mut h2);
        let h2 = h2.finish() | 1; // ensure odd, avoids degenerate gcd with power-of-two bit widths

        (h1, h2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_then_contains() {
        let filter = BloomFilter::new(100);
        filter.add("https://example.com/");
        assert!(filter.contains("https://example.com/"));
    }

    #[test]
    fn test_never_added_usually_absent() {
        let filter = BloomFilter::new(100);
        filter.add("https://example.com/a");
        assert!(!filter.contains("https://example.com/b"));
    }

    #[test]
    fn test_no_false_negatives_across_many_inserts() {
        let filter = BloomFilter::new(1000);
        let urls: Vec<String> = (0..500).map(|i| format!("https://example.com/{}", i)).collect();
        for u in &urls {
            filter.add(u);
        }
        for u in &urls {
            assert!(filter.contains(u), "false negative for {}", u);
        }
    }

    #[test]
    fn test_inserted_count_tracks_adds() {
        let filter = BloomFilter::new(10);
        filter.add("a");
        filter.add("b");
        filter.add("a");
        assert_eq!(filter.inserted_count(), 3);
    }

    #[test]
    fn test_never_shrinks() {
        let filter = BloomFilter::new(10);
        for i in 0..50 {
            filter.add(&format!("url-{}", i));
        }
        assert_eq!(filter.inserted_count(), 50);
    }
}
