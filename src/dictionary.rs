// File: src/dictionary.rs
//! Bulk word loading. Entries arrive as `(word, category, language)` rows;
//! only the word matters to the engine.

use crate::core::types::DictionaryEntry;
use crate::error::{AutocompleteError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A JSON array of entries. Missing `category`/`language`/`frequency` take defaults.
pub fn load_json(path: &Path) -> Result<Vec<DictionaryEntry>> {
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader)
        .map_err(|e| AutocompleteError::InvalidInput(format!("{}: {e}", path.display())))
}

/// One word per line. Blank lines and lines starting with `#` are skipped.
pub fn load_word_list(path: &Path) -> Result<Vec<DictionaryEntry>> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let word = line.trim();
        if word.is_empty() || word.starts_with('#') {
            continue;
        }
        entries.push(DictionaryEntry::new(word));
    }
    Ok(entries)
}

/// Picks the format from the extension: `.json` or plain word list.
pub fn load(path: &Path) -> Result<Vec<DictionaryEntry>> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => load_json(path),
        _ => load_word_list(path),
    }
}
