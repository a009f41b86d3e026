// src/core/types.rs
use crate::boundary::EncryptedPayload;
use serde::{Deserialize, Serialize};

/// Index of a node inside one of the arena-backed prefix indexes.
pub type NodeId = usize;

/// Whether a node completes a word. Terminal nodes carry the word they complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Internal,
    Terminal(String),
}

impl NodeKind {
    pub fn word(&self) -> Option<&str> {
        match self {
            NodeKind::Internal => None,
            NodeKind::Terminal(word) => Some(word),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeKind::Terminal(_))
    }
}

/// Opaque metadata supplied by the dictionary loader.
/// The engine stores it alongside the word and never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordMetadata {
    pub category: String,
    pub language: String,
}

impl Default for WordMetadata {
    fn default() -> Self {
        Self { category: "general".to_string(), language: "en".to_string() }
    }
}

/// One row handed over by the dictionary-loading boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub word: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// Initial selection count for words imported from an existing store.
    #[serde(default)]
    pub frequency: u64,
}

fn default_category() -> String {
    "general".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

impl DictionaryEntry {
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            category: default_category(),
            language: default_language(),
            frequency: 0,
        }
    }

    pub fn metadata(&self) -> WordMetadata {
        WordMetadata { category: self.category.clone(), language: self.language.clone() }
    }
}

/// A ranked suggestion as it leaves the engine. Only the holder of the
/// matching private credential can see which word it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub payload: EncryptedPayload,
    pub frequency: u64,
}
