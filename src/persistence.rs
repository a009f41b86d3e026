// File: src/persistence.rs
use crate::boundary::{EncryptedPayload, PublicCredential};
use crate::config::{EngineConfig, IndexBackend};
use crate::core::engine::{AutocompleteEngine, EngineCredentials};
use crate::core::filter::ExistenceFilter;
use crate::core::frequency::FrequencyStore;
use crate::core::index::{PrefixIndex, PrefixIndexStore};
use crate::core::types::WordMetadata;
use crate::error::{AutocompleteError, Result};
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{info, warn};

const SNAPSHOT_MAGIC: [u8; 4] = *b"TYPA";

/// Upper bound on what a decode may allocate, so a damaged length prefix
/// cannot ask for the whole address space.
const MAX_SNAPSHOT_BYTES: u64 = 1 << 30;

fn codec() -> impl Options {
    bincode::DefaultOptions::new().with_fixint_encoding()
}

/// Borrowed view of the engine, written without cloning anything.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    magic: [u8; 4],
    sealed_for: PublicCredential,
    index: &'a PrefixIndexStore,
    frequencies: &'a FrequencyStore,
    filter: &'a ExistenceFilter,
    payloads: &'a HashMap<String, EncryptedPayload>,
    metadata: &'a HashMap<String, WordMetadata>,
}

/// Owned counterpart of [`SnapshotRef`]; field order must match.
#[derive(Deserialize)]
struct Snapshot {
    magic: [u8; 4],
    sealed_for: PublicCredential,
    index: PrefixIndexStore,
    frequencies: FrequencyStore,
    filter: ExistenceFilter,
    payloads: HashMap<String, EncryptedPayload>,
    metadata: HashMap<String, WordMetadata>,
}

/// A decoded and validated snapshot, ready to be swapped into an engine.
pub(crate) struct SnapshotParts {
    pub(crate) index: PrefixIndexStore,
    pub(crate) frequencies: FrequencyStore,
    pub(crate) filter: ExistenceFilter,
    pub(crate) payloads: HashMap<String, EncryptedPayload>,
    pub(crate) metadata: HashMap<String, WordMetadata>,
}

fn snapshot_view(engine: &AutocompleteEngine) -> SnapshotRef<'_> {
    SnapshotRef {
        magic: SNAPSHOT_MAGIC,
        sealed_for: engine.public_credential(),
        index: &engine.index,
        frequencies: &engine.frequencies,
        filter: &engine.filter,
        payloads: &engine.payloads,
        metadata: &engine.metadata,
    }
}

fn corrupt(detail: impl Into<String>) -> AutocompleteError {
    AutocompleteError::CorruptSnapshot(detail.into())
}

pub fn encode_snapshot(engine: &AutocompleteEngine) -> Result<Vec<u8>> {
    codec()
        .serialize(&snapshot_view(engine))
        .map_err(|e| AutocompleteError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
}

pub(crate) fn decode_snapshot(bytes: &[u8], backend: IndexBackend, credential: PublicCredential) -> Result<SnapshotParts> {
    let snapshot: Snapshot = codec()
        .with_limit(MAX_SNAPSHOT_BYTES)
        .deserialize(bytes)
        .map_err(|e| corrupt(e.to_string()))?;
    validate(snapshot, backend, credential)
}

fn validate(snapshot: Snapshot, backend: IndexBackend, credential: PublicCredential) -> Result<SnapshotParts> {
    let Snapshot { magic, sealed_for, index, frequencies, filter, payloads, metadata } = snapshot;
    if magic != SNAPSHOT_MAGIC {
        return Err(corrupt("not a typeahead snapshot"));
    }
    index.validate()?;
    if !filter.is_well_formed() {
        return Err(corrupt("existence filter is malformed"));
    }
    if index.len() != frequencies.len() || frequencies.words().any(|word| !index.contains(word)) {
        return Err(corrupt("index and frequency table disagree on the word set"));
    }
    if payloads.len() != frequencies.len() || frequencies.words().any(|word| !payloads.contains_key(word)) {
        return Err(corrupt("some words have no sealed payload"));
    }
    if metadata.keys().any(|word| !frequencies.contains(word)) {
        return Err(corrupt("metadata for unknown words"));
    }
    if let Some(word) = frequencies.words().find(|word| !filter.covers_prefixes(word)) {
        return Err(corrupt(format!("existence filter is missing prefixes of {word:?}")));
    }
    if sealed_for != credential {
        warn!("snapshot payloads were sealed for a different public credential");
    }

    let index = if index.backend() == backend {
        index
    } else {
        info!(from = %index.backend(), to = %backend, "snapshot uses another backend, rebuilding index");
        let words: Vec<String> = frequencies.words().cloned().collect();
        PrefixIndexStore::build(backend, &words)
    };

    Ok(SnapshotParts { index, frequencies, filter, payloads, metadata })
}

/// Writes the snapshot next to `path` and renames it into place, so the file
/// at `path` is always either the old snapshot or the complete new one.
pub fn save_to_disk(engine: &AutocompleteEngine, path: &Path) -> Result<()> {
    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    let mut writer = BufWriter::new(&temp_file);
    codec()
        .serialize_into(&mut writer, &snapshot_view(engine))
        .map_err(|e| AutocompleteError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
    writer.flush()?;
    drop(writer);

    temp_file.persist(path).map_err(|e| e.error)?;
    info!(path = %path.display(), words = engine.len(), "snapshot saved");
    Ok(())
}

/// Strict load: any problem with the file is an error. See
/// [`AutocompleteEngine::from_file_or_new`] for the forgiving variant.
pub fn load_from_disk(path: &Path, config: EngineConfig, credentials: EngineCredentials) -> Result<AutocompleteEngine> {
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;
    let mut engine = AutocompleteEngine::new(config, credentials)?;
    engine.restore(&bytes)?;
    Ok(engine)
}
