// File: src/core/frequency.rs
use crate::error::{AutocompleteError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Selection counts per indexed word.
///
/// This is also the authoritative word set: index and filter rebuilds start
/// from its keys. Counts only move up, except through [`FrequencyStore::reset`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyStore {
    counts: BTreeMap<String, u64>,
}

impl FrequencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `word` at zero. Returns `false` if it was already tracked,
    /// in which case its count is left alone.
    pub fn init(&mut self, word: &str) -> bool {
        self.seed(word, 0)
    }

    /// Starts tracking `word` at `count` (dictionary imports carry prior counts).
    /// Has no effect on words already tracked.
    pub fn seed(&mut self, word: &str, count: u64) -> bool {
        if self.counts.contains_key(word) {
            return false;
        }
        self.counts.insert(word.to_string(), count);
        true
    }

    /// 0 for unknown words.
    pub fn get(&self, word: &str) -> u64 {
        self.counts.get(word).copied().unwrap_or(0)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.counts.contains_key(word)
    }

    /// Adds one selection. Unknown words are a caller error, not an implicit insert.
    pub fn increment(&mut self, word: &str) -> Result<u64> {
        let count = self
            .counts
            .get_mut(word)
            .ok_or_else(|| AutocompleteError::WordNotFound(word.to_string()))?;
        *count = count.saturating_add(1);
        Ok(*count)
    }

    pub fn reset(&mut self, word: &str) -> Result<()> {
        let count = self
            .counts
            .get_mut(word)
            .ok_or_else(|| AutocompleteError::WordNotFound(word.to_string()))?;
        *count = 0;
        Ok(())
    }

    /// Stops tracking `word`. Only used when a word is replaced.
    pub(crate) fn remove(&mut self, word: &str) -> Option<u64> {
        self.counts.remove(word)
    }

    /// Tracked words in ascending order.
    pub fn words(&self) -> impl Iterator<Item = &String> {
        self.counts.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, u64)> {
        self.counts.iter().map(|(word, &count)| (word, count))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
