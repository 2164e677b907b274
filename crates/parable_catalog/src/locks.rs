//! Per-idiom write serialization.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of one async mutex per idiom.
///
/// Writers for the same idiom queue behind each other; writers for different
/// idioms and all readers proceed independently.
#[derive(Debug, Clone, Default)]
pub struct IdiomLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl IdiomLocks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive write access to `idiom`.
    pub async fn lock(&self, idiom: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Only the registry holds these, so nobody is using or waiting on them.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(idiom.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of idioms with a live lock.
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    /// Whether no idiom currently holds a lock entry.
    pub async fn is_empty(&self) -> bool {
        self.locks.lock().await.is_empty()
    }
}
