// File: src/core/cancel.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Request-scoped cancellation for `suggest`.
///
/// A very short prefix against a large index can enumerate most of it, so the
/// collectors poll this flag while walking and bail out once it is set.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// How many nodes a collector visits between polls of the flag.
pub(crate) const POLL_INTERVAL: usize = 256;
