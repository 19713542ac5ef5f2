//! Input event queue
//!
//! Key identifiers arrive from an input-capture thread at arbitrary times.
//! The frame loop swaps the whole buffer out once per tick so the engine
//! sees one ordered snapshot per batch.

use std::sync::{Arc, Mutex, PoisonError};

/// Append-only key buffer, drained atomically
///
/// Cloning yields another handle to the same queue; hand a clone to the
/// input-capture side.
#[derive(Debug, Clone, Default)]
pub struct InputQueue {
    keys: Arc<Mutex<Vec<String>>>,
}

impl InputQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one key identifier (duplicates are kept)
    pub fn push(&self, key: impl Into<String>) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(key.into());
    }

    /// Take every queued key, leaving the queue empty
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.keys.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
