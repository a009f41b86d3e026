// File: src/service.rs
use crate::boundary::{EncryptedPayload, PublicCredential};
use crate::core::cancel::Cancellation;
use crate::core::engine::AutocompleteEngine;
use crate::core::types::{DictionaryEntry, Suggestion};
use crate::error::Result;
use parking_lot::RwLock;
use std::sync::Arc;

/// Thread-safe handle for serving one engine to many callers.
///
/// Suggestions share a read lock. Every mutating call holds the write lock for
/// the whole logical operation, so readers never see a half-inserted word or a
/// half-applied confirmation.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<RwLock<AutocompleteEngine>>,
}

impl SharedEngine {
    pub fn new(engine: AutocompleteEngine) -> Self {
        Self { inner: Arc::new(RwLock::new(engine)) }
    }

    pub fn suggest(&self, prefix: &str, k: usize) -> Result<Vec<Suggestion>> {
        self.inner.read().suggest(prefix, k)
    }

    pub fn suggest_cancellable(&self, prefix: &str, k: usize, cancel: &Cancellation) -> Result<Vec<Suggestion>> {
        self.inner.read().suggest_cancellable(prefix, k, cancel)
    }

    pub fn add_word(&self, word: &str, credential: &PublicCredential) -> Result<bool> {
        self.inner.write().add_word(word, credential)
    }

    pub fn add_entry(&self, entry: DictionaryEntry) -> Result<bool> {
        self.inner.write().add_entry(entry)
    }

    pub fn confirm(&self, word: &str) -> Result<u64> {
        self.inner.write().confirm(word)
    }

    pub fn replace_word(&self, old: &str, new: &str, credential: &PublicCredential) -> Result<()> {
        self.inner.write().replace_word(old, new, credential)
    }

    pub fn reset(&self) {
        self.inner.write().reset();
    }

    pub fn restore(&self, bytes: &[u8]) -> Result<()> {
        self.inner.write().restore(bytes)
    }

    pub fn save_snapshot(&self) -> Result<()> {
        self.inner.read().save_snapshot()
    }

    pub fn reveal(&self, payload: &EncryptedPayload) -> Result<String> {
        self.inner.read().reveal(payload)
    }

    pub fn frequency(&self, word: &str) -> u64 {
        self.inner.read().frequency(word)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Runs `f` under the read lock, for callers that need several reads to agree.
    pub fn with_engine<T>(&self, f: impl FnOnce(&AutocompleteEngine) -> T) -> T {
        f(&self.inner.read())
    }
}
