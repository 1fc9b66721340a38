use std::collections::HashMap;

use tokio::sync::RwLock;

use super::versions::KeyVersions;
use super::TxError;

/// Per-client WATCH state: for every watched key, the global version that
/// was current when the watch began.
#[derive(Debug, Default)]
pub struct ClientWatches {
    watches: RwLock<HashMap<String, HashMap<String, u64>>>,
}

impl ClientWatches {
    pub fn new() -> Self {
        Self {
            watches: RwLock::new(HashMap::new()),
        }
    }

    pub async fn watch(&self, client_id: &str, key: &str, version: u64) {
        let mut watches = self.watches.write().await;
        watches
            .entry(client_id.to_string())
            .or_default()
            .insert(key.to_string(), version);
    }

    pub async fn unwatch(&self, client_id: &str) {
        let mut watches = self.watches.write().await;
        watches.remove(client_id);
    }

    /// The compare-and-swap step of EXEC: the transaction is valid only if
    /// no watched key's global version advanced past the watched snapshot.
    ///
    /// A watched key without a global version should be impossible (WATCH
    /// creates one) and is surfaced as an inconsistency rather than silently
    /// committing.
    pub async fn check(&self, client_id: &str, versions: &KeyVersions) -> Result<bool, TxError> {
        let watches = self.watches.read().await;

        let Some(watched) = watches.get(client_id) else {
            return Ok(true);
        };

        for (key, local_version) in watched {
            let current = versions
                .get(key)
                .await
                .ok_or_else(|| TxError::MissingGlobalVersion(key.clone()))?;

            if current > *local_version {
                return Ok(false);
            }
        }

        Ok(true)
    }
}
