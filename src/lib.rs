// src/lib.rs

pub mod boundary;
pub mod config;
pub mod core;
pub mod dictionary;
pub mod error;
pub mod learning;
pub mod logging;
pub mod persistence;
pub mod service;

pub use crate::boundary::{EncryptedPayload, KeyPair, Opener, PrivateCredential, PublicCredential, Sealer};
pub use crate::config::{EngineConfig, FilterConfig, IndexBackend, KeyCustody};
pub use crate::core::cancel::Cancellation;
pub use crate::core::engine::{AutocompleteEngine, EngineCredentials, EngineState};
pub use crate::core::types::{DictionaryEntry, Suggestion, WordMetadata};
pub use crate::error::{AutocompleteError, Result};
pub use crate::service::SharedEngine;
