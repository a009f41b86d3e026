// File: src/error.rs
use thiserror::Error;

/// Every failure the engine reports to its callers.
///
/// `InvalidInput` and `WordNotFound` are caller errors and are never
/// auto-corrected. `Decryption` belongs to whichever side tried to open a
/// payload. `CorruptSnapshot` is normally recovered inside
/// [`AutocompleteEngine::from_file_or_new`](crate::AutocompleteEngine::from_file_or_new).
#[derive(Debug, Error)]
pub enum AutocompleteError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("word not found: {0:?}")]
    WordNotFound(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("suggestion request cancelled")]
    Cancelled,

    #[error("bad credential: {0}")]
    Credential(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AutocompleteError>;
