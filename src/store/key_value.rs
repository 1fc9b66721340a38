use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// A stored string value with an optional absolute expiration deadline.
#[derive(Debug, Clone)]
pub struct StoredValue {
    pub value: Bytes,
    pub expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Instant::now() > deadline,
            None => false,
        }
    }
}

/// The string key/value map, guarded by a readers-writer lock.
///
/// Expiry is lazy: reads hide expired entries but do not remove them, so
/// callers must never assume an expired key frees memory immediately.
#[derive(Debug, Default)]
pub struct KeyValueStore {
    entries: RwLock<HashMap<String, StoredValue>>,
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Stores `value` under `key`, replacing any previous value. A `ttl` of
    /// `None` means the key never expires.
    pub async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) {
        let stored = StoredValue {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };

        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), stored);
    }

    /// Returns the live value for `key`, or `None` when the key is absent or
    /// its expiration has already elapsed.
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        let entries = self.entries.read().await;
        let stored = entries.get(key)?;

        if stored.is_expired() {
            return None;
        }

        Some(stored.value.clone())
    }

    /// Returns every non-expired key matching `pattern`. Only the `"*"`
    /// pattern is supported; anything else matches nothing.
    pub async fn keys(&self, pattern: &str) -> Vec<String> {
        if pattern != "*" {
            return Vec::new();
        }

        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|(_, stored)| !stored.is_expired())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// True when `key` resolves to a live value.
    pub async fn contains(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;

    use super::KeyValueStore;

    #[tokio::test]
    async fn test_set_then_get() {
        let store = KeyValueStore::new();

        store.set("foo", Bytes::from_static(b"bar"), None).await;

        assert_eq!(store.get("foo").await, Some(Bytes::from_static(b"bar")));
        assert_eq!(store.get("missing").await, None);
    }

    #[tokio::test]
    async fn test_set_replaces_previous_value() {
        let store = KeyValueStore::new();

        store.set("foo", Bytes::from_static(b"one"), None).await;
        store.set("foo", Bytes::from_static(b"two"), None).await;

        assert_eq!(store.get("foo").await, Some(Bytes::from_static(b"two")));
    }

    #[tokio::test]
    async fn test_expired_key_is_hidden() {
        let store = KeyValueStore::new();

        store
            .set("gone", Bytes::from_static(b"v"), Some(Duration::from_millis(30)))
            .await;

        assert!(store.get("gone").await.is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(store.get("gone").await, None);
        assert!(store.keys("*").await.is_empty());
    }

    #[tokio::test]
    async fn test_keys_star_pattern_only() {
        let store = KeyValueStore::new();

        store.set("a", Bytes::from_static(b"1"), None).await;
        store.set("b", Bytes::from_static(b"2"), None).await;

        let mut keys = store.keys("*").await;
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

        assert!(store.keys("a*").await.is_empty());
        assert!(store.keys("?").await.is_empty());
    }
}
