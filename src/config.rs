// File: src/config.rs
use crate::error::{AutocompleteError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Which prefix index backs the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    #[default]
    Trie,
    Ternary,
    /// Whole-word binary search tree. Baseline only: every query walks the full tree.
    Ordered,
}

impl IndexBackend {
    pub const ALL: [IndexBackend; 3] = [IndexBackend::Trie, IndexBackend::Ternary, IndexBackend::Ordered];

    pub fn name(self) -> &'static str {
        match self {
            IndexBackend::Trie => "trie",
            IndexBackend::Ternary => "ternary",
            IndexBackend::Ordered => "ordered",
        }
    }
}

impl fmt::Display for IndexBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IndexBackend {
    type Err = AutocompleteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "trie" => Ok(IndexBackend::Trie),
            "ternary" | "tst" => Ok(IndexBackend::Ternary),
            "ordered" | "bst" => Ok(IndexBackend::Ordered),
            other => Err(AutocompleteError::Config(format!("unknown index backend {other:?}"))),
        }
    }
}

/// Who holds the private credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyCustody {
    /// The engine only ever sees the public credential.
    #[default]
    Split,
    /// The engine holds both halves of the key pair. Provides no confidentiality;
    /// kept for compatibility testing against single-process deployments.
    Shared,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Number of distinct prefixes the filter is sized for.
    pub capacity: usize,
    /// Target false-positive rate at `capacity`.
    pub error_rate: f64,
    /// Multiplier applied to the capacity when the filter is rebuilt.
    pub growth_factor: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { capacity: 1000, error_rate: 0.01, growth_factor: 2.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub backend: IndexBackend,
    pub default_k: usize,
    pub filter: FilterConfig,
    /// How many recent selections the learning history keeps.
    pub history_window: usize,
    pub custody: KeyCustody,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::default(),
            default_k: 10,
            filter: FilterConfig::default(),
            history_window: 32,
            custody: KeyCustody::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(text).map_err(|e| AutocompleteError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let filter = &self.filter;
        if filter.capacity == 0 {
            return Err(AutocompleteError::Config("filter.capacity must be positive".into()));
        }
        if !(filter.error_rate > 0.0 && filter.error_rate < 1.0) {
            return Err(AutocompleteError::Config(format!(
                "filter.error_rate must be in (0, 1), got {}",
                filter.error_rate
            )));
        }
        if filter.growth_factor.is_nan() || filter.growth_factor <= 1.0 {
            return Err(AutocompleteError::Config(format!(
                "filter.growth_factor must be greater than 1, got {}",
                filter.growth_factor
            )));
        }
        Ok(())
    }
}
