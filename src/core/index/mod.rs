// File: src/core/index/mod.rs
//! Interchangeable prefix indexes.
//!
//! All three variants answer the same questions for the same input; they only
//! differ in how fast they get there. [`PrefixIndexStore`] wraps whichever one
//! the engine was configured with so that it can be snapshotted as a unit.

pub mod ordered;
pub mod ternary;
pub mod trie;

pub use ordered::OrderedTree;
pub use ternary::TernaryTree;
pub use trie::Trie;

use crate::config::IndexBackend;
use crate::core::cancel::{Cancellation, POLL_INTERVAL};
use crate::error::{AutocompleteError, Result};
use serde::{Deserialize, Serialize};

pub trait PrefixIndex {
    /// Adds a word. Returns `false` if it was already present.
    fn insert(&mut self, word: &str) -> bool;

    /// Every stored word starting with `prefix`, polling `cancel` while walking.
    /// An empty prefix matches every word.
    fn collect_until(&self, prefix: &str, cancel: &Cancellation) -> Result<Vec<String>>;

    /// [`collect_until`](Self::collect_until) with a token nobody can cancel.
    fn collect(&self, prefix: &str) -> Result<Vec<String>> {
        self.collect_until(prefix, &Cancellation::new())
    }

    fn exists_prefix(&self, prefix: &str) -> bool;

    fn contains(&self, word: &str) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Structural check run after deserializing untrusted bytes.
    fn validate(&self) -> Result<()>;
}

/// Accumulates words during a walk and polls the cancellation flag.
pub(crate) struct Collector<'a> {
    cancel: &'a Cancellation,
    visited: usize,
    pub(crate) words: Vec<String>,
}

impl<'a> Collector<'a> {
    pub(crate) fn new(cancel: &'a Cancellation) -> Self {
        Self { cancel, visited: 0, words: Vec::new() }
    }

    pub(crate) fn visit(&mut self) -> Result<()> {
        self.visited += 1;
        if self.visited % POLL_INTERVAL == 0 && self.cancel.is_cancelled() {
            return Err(AutocompleteError::Cancelled);
        }
        Ok(())
    }

    pub(crate) fn push(&mut self, word: &str) {
        self.words.push(word.to_string());
    }

    pub(crate) fn finish(self) -> Result<Vec<String>> {
        if self.cancel.is_cancelled() {
            return Err(AutocompleteError::Cancelled);
        }
        Ok(self.words)
    }
}

pub(crate) fn corrupt(detail: impl Into<String>) -> AutocompleteError {
    AutocompleteError::CorruptSnapshot(detail.into())
}

/// The configured index, in a form that serializes as part of a snapshot.
#[derive(Clone, Serialize, Deserialize)]
pub enum PrefixIndexStore {
    Trie(Trie),
    Ternary(TernaryTree),
    Ordered(OrderedTree),
}

impl PrefixIndexStore {
    pub fn new(backend: IndexBackend) -> Self {
        match backend {
            IndexBackend::Trie => PrefixIndexStore::Trie(Trie::new()),
            IndexBackend::Ternary => PrefixIndexStore::Ternary(TernaryTree::new()),
            IndexBackend::Ordered => PrefixIndexStore::Ordered(OrderedTree::new()),
        }
    }

    /// Builds an index over `words`, which must be sorted and free of duplicates.
    pub fn build(backend: IndexBackend, words: &[String]) -> Self {
        match backend {
            // Sorted input would degenerate the whole-word tree into a list.
            IndexBackend::Ordered => PrefixIndexStore::Ordered(OrderedTree::build_balanced(words)),
            _ => {
                let mut index = Self::new(backend);
                for word in words {
                    index.insert(word);
                }
                index
            }
        }
    }

    pub fn backend(&self) -> IndexBackend {
        match self {
            PrefixIndexStore::Trie(_) => IndexBackend::Trie,
            PrefixIndexStore::Ternary(_) => IndexBackend::Ternary,
            PrefixIndexStore::Ordered(_) => IndexBackend::Ordered,
        }
    }

    fn inner(&self) -> &dyn PrefixIndex {
        match self {
            PrefixIndexStore::Trie(index) => index,
            PrefixIndexStore::Ternary(index) => index,
            PrefixIndexStore::Ordered(index) => index,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn PrefixIndex {
        match self {
            PrefixIndexStore::Trie(index) => index,
            PrefixIndexStore::Ternary(index) => index,
            PrefixIndexStore::Ordered(index) => index,
        }
    }
}

impl PrefixIndex for PrefixIndexStore {
    fn insert(&mut self, word: &str) -> bool {
        self.inner_mut().insert(word)
    }

    fn collect_until(&self, prefix: &str, cancel: &Cancellation) -> Result<Vec<String>> {
        self.inner().collect_until(prefix, cancel)
    }

    fn exists_prefix(&self, prefix: &str) -> bool {
        self.inner().exists_prefix(prefix)
    }

    fn contains(&self, word: &str) -> bool {
        self.inner().contains(word)
    }

    fn len(&self) -> usize {
        self.inner().len()
    }

    fn validate(&self) -> Result<()> {
        self.inner().validate()
    }
}
