// File: src/learning.rs
use crate::core::frequency::FrequencyStore;
use crate::error::Result;
use std::collections::VecDeque;

/// A confirmed selection as reported by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordConfirmation {
    /// What the user had typed when they picked the word, if known.
    pub prefix: Option<String>,
    pub word: String,
}

/// One entry of the recent-selection history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub prefix: Option<String>,
    pub word: String,
    pub frequency_after: u64,
}

/// Applies confirmations to the frequency table and remembers the most recent
/// ones in a fixed-size window. The window lives in memory only.
#[derive(Debug, Clone)]
pub struct LearningEngine {
    window_size: usize,
    history: VecDeque<Selection>,
}

impl LearningEngine {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            history: VecDeque::with_capacity(window_size),
        }
    }

    /// Bumps the word's count. Fails with `WordNotFound` for words that were
    /// never indexed; nothing is recorded in that case.
    pub fn learn(&mut self, frequencies: &mut FrequencyStore, confirmation: WordConfirmation) -> Result<u64> {
        let frequency_after = frequencies.increment(&confirmation.word)?;
        if self.window_size > 0 {
            if self.history.len() == self.window_size {
                self.history.pop_front();
            }
            self.history.push_back(Selection {
                prefix: confirmation.prefix,
                word: confirmation.word,
                frequency_after,
            });
        }
        Ok(frequency_after)
    }

    /// Oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Selection> {
        self.history.iter()
    }

    /// Drops history entries for a word that no longer exists.
    pub fn forget(&mut self, word: &str) {
        self.history.retain(|selection| selection.word != word);
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}
