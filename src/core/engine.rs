use crate::boundary::{EncryptedPayload, KeyPair, Opener, PublicCredential, Sealer};
use crate::config::{EngineConfig, IndexBackend, KeyCustody};
use crate::core::cancel::Cancellation;
use crate::core::filter::{ExistenceFilter, FilterError};
use crate::core::frequency::FrequencyStore;
use crate::core::index::{PrefixIndex, PrefixIndexStore};
use crate::core::ranker::TopKRanker;
use crate::core::types::{DictionaryEntry, Suggestion, WordMetadata};
use crate::error::{AutocompleteError, Result};
use crate::learning::{LearningEngine, Selection, WordConfirmation};
use crate::persistence::{decode_snapshot, save_to_disk, SnapshotParts};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, debug_span, info, warn};

/// Key material handed to the engine at startup.
#[derive(Debug, Clone)]
pub enum EngineCredentials {
    /// Only the public half. The engine can seal but never open.
    Split(PublicCredential),
    /// Both halves. Compatibility mode with no confidentiality.
    Shared(KeyPair),
}

impl EngineCredentials {
    fn custody(&self) -> KeyCustody {
        match self {
            EngineCredentials::Split(_) => KeyCustody::Split,
            EngineCredentials::Shared(_) => KeyCustody::Shared,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Empty,
    Populated,
}

/// Index holder: stores sealed words, ranks them by selection frequency and
/// hands back sealed suggestions.
pub struct AutocompleteEngine {
    pub(crate) config: EngineConfig,
    pub(crate) index: PrefixIndexStore,
    pub(crate) frequencies: FrequencyStore,
    pub(crate) filter: ExistenceFilter,
    pub(crate) payloads: HashMap<String, EncryptedPayload>,
    pub(crate) metadata: HashMap<String, WordMetadata>,
    sealer: Sealer,
    revealer: Option<Opener>,
    learning_engine: LearningEngine,
    ranker: TopKRanker,
    snapshot_path: Option<PathBuf>,
}

impl AutocompleteEngine {
    pub fn new(config: EngineConfig, credentials: EngineCredentials) -> Result<Self> {
        config.validate()?;
        if config.custody != credentials.custody() {
            return Err(AutocompleteError::Config(format!(
                "custody is configured as {:?} but {:?} credentials were supplied",
                config.custody,
                credentials.custody()
            )));
        }

        let (sealer, revealer) = match credentials {
            EngineCredentials::Split(public) => (Sealer::new(public), None),
            EngineCredentials::Shared(keys) => {
                warn!("engine holds both halves of the key pair; suggestions are not confidential");
                (Sealer::new(keys.public()), Some(Opener::new(keys.private().clone())))
            }
        };

        Ok(Self {
            index: PrefixIndexStore::new(config.backend),
            frequencies: FrequencyStore::new(),
            filter: ExistenceFilter::new(config.filter.capacity, config.filter.error_rate),
            payloads: HashMap::new(),
            metadata: HashMap::new(),
            sealer,
            revealer,
            learning_engine: LearningEngine::new(config.history_window),
            ranker: TopKRanker,
            snapshot_path: None,
            config,
        })
    }

    /// Restores from `path` when possible. A missing or unreadable snapshot
    /// means an empty engine; only bad configuration is an error.
    pub fn from_file_or_new(path: impl AsRef<Path>, config: EngineConfig, credentials: EngineCredentials) -> Result<Self> {
        let path = path.as_ref();
        let mut engine = Self::new(config, credentials)?;
        match std::fs::read(path) {
            Ok(bytes) => match engine.restore(&bytes) {
                Ok(()) => info!(path = %path.display(), words = engine.len(), "snapshot loaded"),
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring snapshot, starting empty"),
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "no snapshot, starting empty");
            }
            Err(e) => warn!(path = %path.display(), error = %e, "cannot read snapshot, starting empty"),
        }
        engine.snapshot_path = Some(path.to_path_buf());
        Ok(engine)
    }

    /// Writes to the path given to [`from_file_or_new`](Self::from_file_or_new).
    /// Engines built with [`new`](Self::new) have nowhere to save and succeed trivially.
    pub fn save_snapshot(&self) -> Result<()> {
        match &self.snapshot_path {
            Some(path) => save_to_disk(self, path),
            None => Ok(()),
        }
    }

    /// Replaces the in-memory state with a decoded snapshot. On error the
    /// current state is left exactly as it was.
    pub fn restore(&mut self, bytes: &[u8]) -> Result<()> {
        let parts = decode_snapshot(bytes, self.config.backend, self.sealer.credential())?;
        let SnapshotParts { index, frequencies, filter, payloads, metadata } = parts;
        self.index = index;
        self.frequencies = frequencies;
        self.filter = filter;
        self.payloads = payloads;
        self.metadata = metadata;
        self.learning_engine.clear();
        self.ensure_filter_capacity();
        Ok(())
    }

    /// Seals `word` for `credential` and indexes it. Returns `false` if the
    /// word was already present, in which case nothing changes.
    pub fn add_word(&mut self, word: &str, credential: &PublicCredential) -> Result<bool> {
        self.insert(word, credential, WordMetadata::default(), 0)
    }

    /// Dictionary-boundary insert, sealed for the engine's configured credential.
    pub fn add_entry(&mut self, entry: DictionaryEntry) -> Result<bool> {
        let credential = self.sealer.credential();
        let metadata = entry.metadata();
        self.insert(&entry.word, &credential, metadata, entry.frequency)
    }

    /// Bulk load. Stops at the first invalid entry and returns how many were new.
    pub fn add_entries<I>(&mut self, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = DictionaryEntry>,
    {
        let mut added = 0;
        for entry in entries {
            if self.add_entry(entry)? {
                added += 1;
            }
        }
        debug!(added, total = self.len(), "bulk load finished");
        Ok(added)
    }

    fn insert(&mut self, word: &str, credential: &PublicCredential, metadata: WordMetadata, seed: u64) -> Result<bool> {
        let _span = debug_span!("add_word", backend = %self.index.backend(), len = word.chars().count()).entered();
        if word.is_empty() {
            return Err(AutocompleteError::InvalidInput("word must not be empty".to_string()));
        }
        if self.frequencies.contains(word) {
            return Ok(false);
        }

        // Seal first so a failure leaves every structure untouched.
        let payload = Sealer::new(*credential).wrap(word)?;
        self.index.insert(word);
        self.frequencies.seed(word, seed);
        self.filter.add_prefixes(word);
        self.payloads.insert(word.to_string(), payload);
        self.metadata.insert(word.to_string(), metadata);
        self.ensure_filter_capacity();
        Ok(true)
    }

    /// Rebuilds the filter from the authoritative word set when it has taken
    /// in more keys than it was sized for.
    fn ensure_filter_capacity(&mut self) {
        while let Err(FilterError::CapacityExceeded { inserted, capacity }) = self.filter.check_capacity() {
            let growth = self.config.filter.growth_factor;
            let grown = (capacity.max(inserted) as f64 * growth).ceil() as usize;
            info!(inserted, capacity, new_capacity = grown, "existence filter full, rebuilding");
            self.rebuild_filter(grown);
        }
    }

    fn rebuild_filter(&mut self, capacity: usize) {
        let mut filter = ExistenceFilter::new(capacity, self.config.filter.error_rate);
        for word in self.frequencies.words() {
            filter.add_prefixes(word);
        }
        self.filter = filter;
    }

    /// Index and filter from scratch, from the frequency table's word set.
    fn rebuild_structures(&mut self) {
        let words: Vec<String> = self.frequencies.words().cloned().collect();
        self.index = PrefixIndexStore::build(self.config.backend, &words);
        self.rebuild_filter(self.filter.capacity());
        self.ensure_filter_capacity();
    }

    pub fn suggest(&self, prefix: &str, k: usize) -> Result<Vec<Suggestion>> {
        self.suggest_cancellable(prefix, k, &Cancellation::new())
    }

    /// Top `k` sealed suggestions for `prefix`. An empty prefix, or one the
    /// filter rules out, gives an empty list rather than an error.
    pub fn suggest_cancellable(&self, prefix: &str, k: usize, cancel: &Cancellation) -> Result<Vec<Suggestion>> {
        let _span = debug_span!("suggest", backend = %self.index.backend(), prefix_len = prefix.chars().count()).entered();
        if prefix.is_empty() {
            return Ok(Vec::new());
        }
        if !self.filter.may_contain(prefix) {
            debug!("rejected by existence filter");
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let candidates = self.index.collect_until(prefix, cancel)?;
        let ranked = self.ranker.rank(&candidates, &self.frequencies, k);
        let suggestions: Vec<Suggestion> = ranked
            .into_iter()
            .filter_map(|(word, frequency)| match self.payloads.get(&word) {
                Some(payload) => Some(Suggestion { payload: payload.clone(), frequency }),
                None => {
                    warn!("indexed word has no sealed payload");
                    None
                }
            })
            .collect();
        debug!(
            candidates = candidates.len(),
            returned = suggestions.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "suggest finished"
        );
        Ok(suggestions)
    }

    /// Suggestions with the configured default `k`.
    pub fn suggest_default(&self, prefix: &str) -> Result<Vec<Suggestion>> {
        self.suggest(prefix, self.config.default_k)
    }

    /// Records one selection of `word` and returns its new count.
    pub fn confirm(&mut self, word: &str) -> Result<u64> {
        self.learn(WordConfirmation { prefix: None, word: word.to_string() })
    }

    /// Like [`confirm`](Self::confirm), remembering what was typed.
    pub fn confirm_from(&mut self, prefix: &str, word: &str) -> Result<u64> {
        self.learn(WordConfirmation { prefix: Some(prefix.to_string()), word: word.to_string() })
    }

    fn learn(&mut self, confirmation: WordConfirmation) -> Result<u64> {
        let _span = debug_span!("confirm", backend = %self.index.backend()).entered();
        let count = self.learning_engine.learn(&mut self.frequencies, confirmation)?;
        debug!(count, "selection recorded");
        Ok(count)
    }

    /// Delete-and-insert: `old` disappears from every structure and `new` is
    /// indexed fresh (keeping `old`'s metadata).
    pub fn replace_word(&mut self, old: &str, new: &str, credential: &PublicCredential) -> Result<()> {
        if new.is_empty() {
            return Err(AutocompleteError::InvalidInput("replacement word must not be empty".to_string()));
        }
        if !self.frequencies.contains(old) {
            return Err(AutocompleteError::WordNotFound(old.to_string()));
        }
        if old == new {
            return Ok(());
        }

        let payload = if self.frequencies.contains(new) {
            None
        } else {
            Some(Sealer::new(*credential).wrap(new)?)
        };

        self.frequencies.remove(old);
        self.payloads.remove(old);
        let metadata = self.metadata.remove(old).unwrap_or_default();
        self.learning_engine.forget(old);

        if let Some(payload) = payload {
            self.frequencies.init(new);
            self.payloads.insert(new.to_string(), payload);
            self.metadata.insert(new.to_string(), metadata);
        }
        self.rebuild_structures();
        info!(words = self.len(), "word replaced, structures rebuilt");
        Ok(())
    }

    pub fn reset_frequency(&mut self, word: &str) -> Result<()> {
        self.frequencies.reset(word)
    }

    /// Back to `Empty`, as if freshly constructed.
    pub fn reset(&mut self) {
        self.index = PrefixIndexStore::new(self.config.backend);
        self.frequencies = FrequencyStore::new();
        self.filter = ExistenceFilter::new(self.config.filter.capacity, self.config.filter.error_rate);
        self.payloads.clear();
        self.metadata.clear();
        self.learning_engine.clear();
        info!("engine reset");
    }

    /// Opens a payload with the engine's own private credential. Only
    /// available under shared custody.
    pub fn reveal(&self, payload: &EncryptedPayload) -> Result<String> {
        match &self.revealer {
            Some(opener) => opener.unwrap(payload),
            None => Err(AutocompleteError::Config(
                "engine holds no private credential under split custody".to_string(),
            )),
        }
    }

    pub fn state(&self) -> EngineState {
        if self.frequencies.is_empty() {
            EngineState::Empty
        } else {
            EngineState::Populated
        }
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.frequencies.contains(word)
    }

    pub fn frequency(&self, word: &str) -> u64 {
        self.frequencies.get(word)
    }

    pub fn metadata(&self, word: &str) -> Option<&WordMetadata> {
        self.metadata.get(word)
    }

    /// Indexed words in ascending order.
    pub fn words(&self) -> impl Iterator<Item = &String> {
        self.frequencies.words()
    }

    pub fn history(&self) -> impl Iterator<Item = &Selection> {
        self.learning_engine.history()
    }

    pub fn backend(&self) -> IndexBackend {
        self.index.backend()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn public_credential(&self) -> PublicCredential {
        self.sealer.credential()
    }

    pub fn filter(&self) -> &ExistenceFilter {
        &self.filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::KeyPair;

    fn engine_with(words: &[&str]) -> (AutocompleteEngine, Opener) {
        let keys = KeyPair::generate();
        let mut engine = AutocompleteEngine::new(EngineConfig::default(), EngineCredentials::Split(keys.public())).unwrap();
        for word in words {
            engine.add_word(word, &keys.public()).unwrap();
        }
        (engine, Opener::new(keys.private().clone()))
    }

    fn opened(engine: &AutocompleteEngine, opener: &Opener, prefix: &str) -> Vec<String> {
        engine
            .suggest(prefix, 10)
            .unwrap()
            .iter()
            .map(|s| opener.unwrap(&s.payload).unwrap())
            .collect()
    }

    #[test]
    fn starts_empty_and_populates() {
        let (mut engine, _) = engine_with(&[]);
        assert_eq!(engine.state(), EngineState::Empty);
        let credential = engine.public_credential();
        assert!(engine.add_word("cat", &credential).unwrap());
        assert!(!engine.add_word("cat", &credential).unwrap());
        assert_eq!(engine.state(), EngineState::Populated);
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn rejects_empty_word() {
        let (mut engine, _) = engine_with(&[]);
        let credential = engine.public_credential();
        assert!(matches!(engine.add_word("", &credential), Err(AutocompleteError::InvalidInput(_))));
        assert!(engine.is_empty());
    }

    #[test]
    fn empty_and_unknown_prefixes_give_empty_lists() {
        let (engine, _) = engine_with(&["cat", "dog"]);
        assert!(engine.suggest("", 10).unwrap().is_empty());
        assert!(engine.suggest("xyz123notaword", 10).unwrap().is_empty());
    }

    #[test]
    fn confirm_reorders_suggestions() {
        let (mut engine, opener) = engine_with(&["cat", "car", "cart", "carbon", "case"]);
        assert_eq!(opened(&engine, &opener, "car"), vec!["car", "carbon", "cart"]);
        engine.confirm("carbon").unwrap();
        assert_eq!(engine.confirm("carbon").unwrap(), 2);
        assert_eq!(opened(&engine, &opener, "car"), vec!["carbon", "car", "cart"]);
    }

    #[test]
    fn confirm_unknown_word_fails() {
        let (mut engine, _) = engine_with(&["cat"]);
        assert!(matches!(engine.confirm("dog"), Err(AutocompleteError::WordNotFound(_))));
    }

    #[test]
    fn filter_grows_past_capacity_without_false_negatives() {
        let keys = KeyPair::generate();
        let mut config = EngineConfig::default();
        config.filter.capacity = 8;
        let mut engine = AutocompleteEngine::new(config, EngineCredentials::Split(keys.public())).unwrap();
        let words: Vec<String> = (0..200).map(|i| format!("item{i:03}")).collect();
        for word in &words {
            engine.add_word(word, &keys.public()).unwrap();
        }
        assert!(engine.filter().capacity() > 8);
        assert!(engine.filter().check_capacity().is_ok());
        for word in &words {
            assert_eq!(engine.suggest(word, 1).unwrap().len(), 1, "{word}");
        }
    }

    #[test]
    fn replace_removes_old_membership() {
        let (mut engine, opener) = engine_with(&["colour", "cold"]);
        engine.confirm("colour").unwrap();
        let credential = engine.public_credential();
        engine.replace_word("colour", "color", &credential).unwrap();
        assert!(!engine.contains("colour"));
        assert_eq!(engine.frequency("color"), 0);
        assert_eq!(opened(&engine, &opener, "col"), vec!["cold", "color"]);
        assert!(engine.suggest("colou", 10).unwrap().is_empty());
        assert!(matches!(
            engine.replace_word("colour", "x", &credential),
            Err(AutocompleteError::WordNotFound(_))
        ));
    }

    #[test]
    fn reset_returns_to_empty() {
        let (mut engine, _) = engine_with(&["cat"]);
        engine.reset();
        assert_eq!(engine.state(), EngineState::Empty);
        assert!(engine.suggest("c", 10).unwrap().is_empty());
    }

    #[test]
    fn split_custody_cannot_reveal() {
        let (engine, _) = engine_with(&["cat"]);
        let payload = engine.suggest("c", 1).unwrap().remove(0).payload;
        assert!(matches!(engine.reveal(&payload), Err(AutocompleteError::Config(_))));
    }

    #[test]
    fn shared_custody_can_reveal() {
        let keys = KeyPair::generate();
        let config = EngineConfig { custody: KeyCustody::Shared, ..EngineConfig::default() };
        let mut engine = AutocompleteEngine::new(config, EngineCredentials::Shared(keys.clone())).unwrap();
        engine.add_word("dove", &keys.public()).unwrap();
        let payload = engine.suggest("do", 1).unwrap().remove(0).payload;
        assert_eq!(engine.reveal(&payload).unwrap(), "dove");
    }

    #[test]
    fn custody_mismatch_is_a_config_error() {
        let keys = KeyPair::generate();
        let result = AutocompleteEngine::new(EngineConfig::default(), EngineCredentials::Shared(keys));
        assert!(matches!(result, Err(AutocompleteError::Config(_))));
    }

    #[test]
    fn dictionary_entries_keep_metadata_and_seed() {
        let (mut engine, opener) = engine_with(&["data"]);
        let entry = DictionaryEntry {
            word: "database".to_string(),
            category: "tech".to_string(),
            language: "en".to_string(),
            frequency: 7,
        };
        assert!(engine.add_entry(entry).unwrap());
        assert_eq!(engine.metadata("database").unwrap().category, "tech");
        assert_eq!(opened(&engine, &opener, "data"), vec!["database", "data"]);
    }

    #[test]
    fn cancelled_suggest_reports_cancellation() {
        let words: Vec<String> = (0..1000).map(|i| format!("a{i:04}")).collect();
        let refs: Vec<&str> = words.iter().map(String::as_str).collect();
        let (engine, _) = engine_with(&refs);
        let cancel = Cancellation::new();
        cancel.cancel();
        assert!(matches!(engine.suggest_cancellable("a", 5, &cancel), Err(AutocompleteError::Cancelled)));
    }
}
