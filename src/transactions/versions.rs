use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

/// Tracks the latest committed version of each key.
///
/// Versions are drawn from a process-wide monotonic counter, so two bumps of
/// different keys still observe a total order.
#[derive(Debug, Default)]
pub struct KeyVersions {
    versions: RwLock<HashMap<String, u64>>,
    counter: AtomicU64,
}

impl KeyVersions {
    pub fn new() -> Self {
        Self {
            versions: RwLock::new(HashMap::new()),
            counter: AtomicU64::new(0),
        }
    }

    fn next_version(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub async fn get(&self, key: &str) -> Option<u64> {
        let versions = self.versions.read().await;
        versions.get(key).copied()
    }

    /// Assigns a fresh version to `key`, creating the entry when absent.
    pub async fn upsert(&self, key: &str) -> u64 {
        let mut versions = self.versions.write().await;
        let version = self.next_version();
        versions.insert(key.to_string(), version);
        version
    }

    /// Bumps `key` only when it is already tracked. The WATCH path creates
    /// entries, so untracked keys have no observers and need no version.
    pub async fn bump_if_tracked(&self, key: &str) {
        let mut versions = self.versions.write().await;
        if let Some(slot) = versions.get_mut(key) {
            *slot = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        }
    }
}
