// File: src/core/filter.rs
use serde::{Deserialize, Serialize};
use std::f64::consts::LN_2;
use thiserror::Error;

/// Raised when more distinct keys went in than the filter was sized for.
/// The engine answers it with a rebuild; it never reaches callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("existence filter holds {inserted} keys but was sized for {capacity}")]
    CapacityExceeded { inserted: usize, capacity: usize },
}

/// Bloom filter over every prefix of every indexed word.
///
/// No false negatives. Bit positions come from the two halves of a blake3
/// digest (Kirsch-Mitzenmacher double hashing), which keeps them stable across
/// processes so a snapshotted filter stays valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistenceFilter {
    bits: Vec<u64>,
    num_bits: u64,
    num_hashes: u32,
    capacity: usize,
    error_rate: f64,
    inserted: usize,
}

impl ExistenceFilter {
    pub fn new(capacity: usize, error_rate: f64) -> Self {
        let n = capacity.max(1) as f64;
        let m = (-(n * error_rate.ln()) / (LN_2 * LN_2)).ceil().max(64.0);
        let num_bits = m as u64;
        let num_hashes = ((m / n) * LN_2).round().max(1.0) as u32;
        let words = num_bits.div_ceil(64) as usize;
        Self {
            bits: vec![0; words],
            num_bits,
            num_hashes,
            capacity: capacity.max(1),
            error_rate,
            inserted: 0,
        }
    }

    fn positions(&self, key: &str) -> impl Iterator<Item = u64> {
        let digest = blake3::hash(key.as_bytes());
        let bytes = digest.as_bytes();
        let mut lo = [0u8; 8];
        let mut hi = [0u8; 8];
        lo.copy_from_slice(&bytes[..8]);
        hi.copy_from_slice(&bytes[8..16]);
        let h1 = u64::from_le_bytes(lo);
        // An even step could cycle through only part of an even-sized table.
        let h2 = u64::from_le_bytes(hi) | 1;
        let m = self.num_bits;
        (0..u64::from(self.num_hashes)).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % m)
    }

    fn get_bit(&self, pos: u64) -> bool {
        self.bits[(pos / 64) as usize] & (1u64 << (pos % 64)) != 0
    }

    /// Marks `key` present. Returns `true` if it was not reported present before.
    pub fn add(&mut self, key: &str) -> bool {
        let mut fresh = false;
        let positions: Vec<u64> = self.positions(key).collect();
        for pos in positions {
            let word = &mut self.bits[(pos / 64) as usize];
            let mask = 1u64 << (pos % 64);
            if *word & mask == 0 {
                fresh = true;
                *word |= mask;
            }
        }
        if fresh {
            self.inserted += 1;
        }
        fresh
    }

    /// Adds every prefix of `word`, the word itself included ("cat" adds "c", "ca", "cat").
    pub fn add_prefixes(&mut self, word: &str) {
        for (end, c) in word.char_indices() {
            self.add(&word[..end + c.len_utf8()]);
        }
    }

    pub fn may_contain(&self, key: &str) -> bool {
        self.positions(key).all(|pos| self.get_bit(pos))
    }

    /// Whether every prefix [`add_prefixes`](Self::add_prefixes) would add for `word` is present.
    pub fn covers_prefixes(&self, word: &str) -> bool {
        word.char_indices().all(|(end, c)| self.may_contain(&word[..end + c.len_utf8()]))
    }

    pub fn check_capacity(&self) -> Result<(), FilterError> {
        if self.inserted > self.capacity {
            return Err(FilterError::CapacityExceeded { inserted: self.inserted, capacity: self.capacity });
        }
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    /// Approximate number of distinct keys added.
    pub fn len(&self) -> usize {
        self.inserted
    }

    pub fn is_empty(&self) -> bool {
        self.inserted == 0
    }

    /// `(1 - e^{-kn/m})^k` for the current fill.
    pub fn estimated_false_positive_rate(&self) -> f64 {
        let k = f64::from(self.num_hashes);
        let n = self.inserted as f64;
        let m = self.num_bits as f64;
        (1.0 - (-k * n / m).exp()).powf(k)
    }

    /// Structural check for filters read back from a snapshot.
    pub fn is_well_formed(&self) -> bool {
        self.num_bits > 0
            && self.num_hashes > 0
            && self.bits.len() as u64 == self.num_bits.div_ceil(64)
            && self.error_rate > 0.0
            && self.error_rate < 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn adding_a_word_covers_all_its_prefixes() {
        let mut filter = ExistenceFilter::new(100, 0.01);
        filter.add_prefixes("cat");
        for key in ["c", "ca", "cat"] {
            assert!(filter.may_contain(key), "{key}");
        }
    }

    #[test]
    fn multibyte_prefixes_split_on_char_boundaries() {
        let mut filter = ExistenceFilter::new(100, 0.01);
        filter.add_prefixes("né");
        assert!(filter.may_contain("n"));
        assert!(filter.may_contain("né"));
    }

    #[test]
    fn false_positive_rate_stays_near_target() {
        let mut filter = ExistenceFilter::new(1000, 0.01);
        for i in 0..1000 {
            filter.add(&format!("present-{i}"));
        }
        let false_hits = (0..10_000).filter(|i| filter.may_contain(&format!("absent-{i}"))).count();
        assert!(false_hits < 300, "{false_hits} false positives out of 10000");
    }

    #[test]
    fn reports_capacity_overflow() {
        let mut filter = ExistenceFilter::new(10, 0.01);
        for i in 0..10 {
            filter.add(&i.to_string());
        }
        assert!(filter.check_capacity().is_ok());
        for i in 10..40 {
            filter.add(&i.to_string());
        }
        assert!(matches!(filter.check_capacity(), Err(FilterError::CapacityExceeded { capacity: 10, .. })));
    }

    #[test]
    fn coverage_needs_every_prefix() {
        let mut filter = ExistenceFilter::new(100, 0.01);
        filter.add_prefixes("door");
        assert!(filter.covers_prefixes("door"));
        assert!(filter.covers_prefixes("do"));
        assert!(!ExistenceFilter::new(100, 0.01).covers_prefixes("door"));
    }

    #[test]
    fn re_adding_a_key_does_not_count_twice() {
        let mut filter = ExistenceFilter::new(100, 0.01);
        assert!(filter.add("car"));
        assert!(!filter.add("car"));
        assert_eq!(filter.len(), 1);
    }

    proptest! {
        #[test]
        fn never_reports_false_negatives(words in proptest::collection::vec("[a-z]{1,10}", 1..200)) {
            let mut filter = ExistenceFilter::new(50, 0.05);
            for word in &words {
                filter.add_prefixes(word);
            }
            for word in &words {
                for end in 1..=word.len() {
                    prop_assert!(filter.may_contain(&word[..end]));
                }
            }
        }
    }
}
