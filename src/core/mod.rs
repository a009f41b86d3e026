// src/core/mod.rs

pub mod cancel;
pub mod engine;
pub mod filter;
pub mod frequency;
pub mod index;
pub mod ranker;
pub mod types;
