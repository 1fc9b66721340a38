//! The in-memory engine: a TTL-bearing string map plus named streams.

mod key_value;
mod stream;

use std::time::Duration;

use bytes::Bytes;

pub use key_value::{KeyValueStore, StoredValue};
pub use stream::{
    records_to_resp, Stream, StreamError, StreamRecord, StreamsManager, DEFAULT_STREAM_MAX_LEN,
};

/// Facade over the two data stores. Plain keys and stream names live in
/// disjoint namespaces; a key never resolves as both.
#[derive(Debug, Default)]
pub struct Store {
    kv: KeyValueStore,
    streams: StreamsManager,
}

impl Store {
    pub fn new() -> Self {
        Self {
            kv: KeyValueStore::new(),
            streams: StreamsManager::new(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Bytes> {
        self.kv.get(key).await
    }

    pub async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) {
        self.kv.set(key, value, ttl).await
    }

    pub async fn keys(&self, pattern: &str) -> Vec<String> {
        self.kv.keys(pattern).await
    }

    pub async fn contains_key(&self, key: &str) -> bool {
        self.kv.contains(key).await
    }

    pub async fn xadd(
        &self,
        name: &str,
        id: &str,
        fields: Vec<(String, Bytes)>,
    ) -> Result<StreamRecord, StreamError> {
        self.streams.xadd(name, id, fields).await
    }

    pub async fn xrange(
        &self,
        name: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<StreamRecord>, StreamError> {
        self.streams.xrange(name, start, end).await
    }

    pub async fn xread(&self, name: &str, start_id: &str) -> Result<Vec<StreamRecord>, StreamError> {
        self.streams.xread(name, start_id).await
    }

    pub async fn xread_block(
        &self,
        name: &str,
        start_id: &str,
        block_ms: u64,
        no_timeout: bool,
    ) -> Result<Vec<StreamRecord>, StreamError> {
        self.streams
            .xread_block(name, start_id, block_ms, no_timeout)
            .await
    }

    pub async fn is_stream(&self, name: &str) -> bool {
        self.streams.is_stream(name).await
    }
}
