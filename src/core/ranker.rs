// File: src/core/ranker.rs
use crate::core::frequency::FrequencyStore;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

/// Heap entry ordered so that the *worst* candidate sits on top of a max-heap:
/// lower frequency is worse, and among equal frequencies the later word is worse.
#[derive(PartialEq, Eq)]
struct Ranked<'a> {
    frequency: u64,
    word: &'a str,
}

impl Ord for Ranked<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        Reverse(self.frequency)
            .cmp(&Reverse(other.frequency))
            .then_with(|| self.word.cmp(other.word))
    }
}

impl PartialOrd for Ranked<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Stateless per-query top-K selection.
///
/// Output is ordered by descending frequency with ascending lexicographic
/// tie-break, holds each word at most once, and never exceeds `k` entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopKRanker;

impl TopKRanker {
    pub fn rank(&self, candidates: &[String], frequencies: &FrequencyStore, k: usize) -> Vec<(String, u64)> {
        if k == 0 {
            return Vec::new();
        }

        let mut seen: HashSet<&str> = HashSet::with_capacity(candidates.len());
        let mut heap: BinaryHeap<Ranked<'_>> = BinaryHeap::with_capacity(k + 1);
        for word in candidates {
            if !seen.insert(word.as_str()) {
                continue;
            }
            heap.push(Ranked { frequency: frequencies.get(word), word });
            if heap.len() > k {
                heap.pop();
            }
        }

        // Ascending under `Ranked`'s order is best-first.
        heap.into_sorted_vec()
            .into_iter()
            .map(|ranked| (ranked.word.to_string(), ranked.frequency))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn store(entries: &[(&str, u64)]) -> FrequencyStore {
        let mut store = FrequencyStore::new();
        for &(word, count) in entries {
            store.seed(word, count);
        }
        store
    }

    fn words(items: &[(String, u64)]) -> Vec<&str> {
        items.iter().map(|(w, _)| w.as_str()).collect()
    }

    #[test]
    fn ties_break_lexicographically() {
        let freq = store(&[("cat", 5), ("car", 5), ("cart", 2)]);
        let candidates = vec!["cat".to_string(), "cart".to_string(), "car".to_string()];
        let ranked = TopKRanker.rank(&candidates, &freq, 10);
        assert_eq!(words(&ranked), vec!["car", "cat", "cart"]);
        assert_eq!(ranked[0].1, 5);
    }

    #[test]
    fn truncates_to_k_keeping_the_best() {
        let freq = store(&[("a", 1), ("b", 9), ("c", 4), ("d", 9)]);
        let candidates: Vec<String> = ["a", "b", "c", "d"].iter().map(|w| w.to_string()).collect();
        assert_eq!(words(&TopKRanker.rank(&candidates, &freq, 2)), vec!["b", "d"]);
        assert!(TopKRanker.rank(&candidates, &freq, 0).is_empty());
    }

    #[test]
    fn duplicates_are_collapsed() {
        let freq = store(&[("dog", 1)]);
        let candidates = vec!["dog".to_string(), "dog".to_string(), "dog".to_string()];
        assert_eq!(words(&TopKRanker.rank(&candidates, &freq, 5)), vec!["dog"]);
    }

    proptest! {
        #[test]
        fn matches_a_full_sort(
            entries in proptest::collection::btree_map("[a-e]{1,4}", 0u64..5, 0..30),
            k in 0usize..12,
        ) {
            let mut freq = FrequencyStore::new();
            for (word, &count) in &entries {
                freq.seed(word, count);
            }
            let mut candidates: Vec<String> = entries.keys().cloned().collect();
            candidates.extend(entries.keys().take(3).cloned());

            let mut expected: Vec<(String, u64)> = entries.iter().map(|(w, &c)| (w.clone(), c)).collect();
            expected.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            expected.truncate(k);

            prop_assert_eq!(TopKRanker.rank(&candidates, &freq, k), expected);
        }
    }
}
