//! Append-only streams with bounded retention and blocking readers.
//!
//! Every stream keeps its records ordered by `(ms, seq)` id, strictly
//! increasing. Records are held in a deque with a side map from record id to
//! absolute position, so id lookups and head evictions are both O(1).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use jiff::Timestamp;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};

use crate::resp::RespValue;

/// Streams keep at most this many records unless configured otherwise.
pub const DEFAULT_STREAM_MAX_LEN: usize = 1000;

#[derive(Error, Debug, PartialEq)]
pub enum StreamError {
    #[error("ERR The stream specified does not exist")]
    NoSuchStream,
    #[error("ERR The ID specified in XADD must be greater than 0-0")]
    IdNotGreaterThanZero,
    #[error("ERR The ID specified in XADD is equal or smaller than the target stream top item")]
    IdNotMonotonic,
    #[error("ERR The {0} part of the ID specified is invalid")]
    InvalidIdPart(&'static str),
    #[error("ERR Invalid stream ID format")]
    InvalidIdFormat,
    #[error("ERR The start or end ID is invalid")]
    InvalidRangeMarker,
}

/// One stream entry. `id` is always the canonical `"<ms>-<seq>"` rendering of
/// the `(ms, seq)` pair next to it.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRecord {
    pub id: String,
    pub ms: i64,
    pub seq: u64,
    pub fields: Vec<(String, Bytes)>,
}

/// A stream id as requested by a client, before auto-generation.
#[derive(Debug, Clone, Copy, PartialEq)]
enum RequestedId {
    /// `*`: generate both milliseconds and sequence.
    AutoAll,
    /// `<ms>-*`: explicit milliseconds, generate the sequence.
    AutoSeq { ms: i64 },
    /// `<ms>-<seq>`: fully explicit.
    Explicit { ms: i64, seq: u64 },
}

/// Parses a requested stream id.
///
/// Accepts the wildcard forms `*` and `<ms>-*` as well as fully explicit
/// `<ms>-<seq>` ids. The range markers `-` and `+` are not ids and are
/// handled by the range scan, never here.
fn parse_stream_id(id: &str) -> Result<RequestedId, StreamError> {
    if id == "*" {
        return Ok(RequestedId::AutoAll);
    }

    let parts: Vec<&str> = id.split('-').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(StreamError::InvalidIdFormat);
    }

    let ms = parts[0]
        .parse::<i64>()
        .map_err(|_| StreamError::InvalidIdPart("milliseconds"))?;

    if parts[1] == "*" {
        return Ok(RequestedId::AutoSeq { ms });
    }

    let seq = parts[1]
        .parse::<u64>()
        .map_err(|_| StreamError::InvalidIdPart("sequence"))?;

    Ok(RequestedId::Explicit { ms, seq })
}

fn unix_millis_now() -> i64 {
    Timestamp::now().as_millisecond()
}

/// Resolves a requested id against the last record of the stream.
///
/// Wildcard sequences continue the last record's sequence when the
/// milliseconds match and restart at zero otherwise; on an empty stream a
/// requested `0-*` yields `0-1` because `0-0` is reserved.
fn resolve_id(
    requested: RequestedId,
    last: Option<(i64, u64)>,
) -> Result<(i64, u64), StreamError> {
    let resolved = match requested {
        RequestedId::Explicit { ms, seq } => (ms, seq),
        RequestedId::AutoSeq { ms } => match last {
            Some((last_ms, last_seq)) if last_ms == ms => (ms, last_seq + 1),
            Some(_) => (ms, 0),
            None if ms == 0 => (ms, 1),
            None => (ms, 0),
        },
        RequestedId::AutoAll => {
            let now = unix_millis_now();
            match last {
                Some((last_ms, last_seq)) if last_ms == now => (now, last_seq + 1),
                _ => (now, 0),
            }
        }
    };

    if let Some(last) = last {
        if resolved <= last {
            return Err(StreamError::IdNotMonotonic);
        }
    }

    Ok(resolved)
}

#[derive(Debug)]
struct StreamInner {
    records: VecDeque<StreamRecord>,
    /// Record id to absolute position; `head` is the absolute position of
    /// `records[0]`, so the deque slot is `position - head`.
    positions: HashMap<String, u64>,
    head: u64,
    max_len: usize,
    subscribers: HashMap<u64, mpsc::Sender<()>>,
    next_subscriber_id: u64,
}

/// One named stream: ordered records plus the wakeup registry for blocked
/// readers. All state sits behind a single readers-writer lock.
#[derive(Debug)]
pub struct Stream {
    inner: RwLock<StreamInner>,
}

impl Stream {
    fn new() -> Self {
        Self::with_max_len(DEFAULT_STREAM_MAX_LEN)
    }

    fn with_max_len(max_len: usize) -> Self {
        Self {
            inner: RwLock::new(StreamInner {
                records: VecDeque::new(),
                positions: HashMap::new(),
                head: 0,
                max_len,
                subscribers: HashMap::new(),
                next_subscriber_id: 0,
            }),
        }
    }

    /// Validates the requested id, resolves wildcards, appends the record,
    /// trims the stream to its retention bound, and wakes blocked readers.
    ///
    /// Validation and append happen under one write lock so concurrent adds
    /// cannot interleave between the ordering check and the insert.
    async fn add(
        &self,
        id: &str,
        fields: Vec<(String, Bytes)>,
    ) -> Result<StreamRecord, StreamError> {
        let requested = parse_stream_id(id)?;

        if let RequestedId::Explicit { ms: 0, seq: 0 } = requested {
            return Err(StreamError::IdNotGreaterThanZero);
        }

        let mut inner = self.inner.write().await;

        let last = inner.records.back().map(|record| (record.ms, record.seq));
        let (ms, seq) = resolve_id(requested, last)?;

        let record = StreamRecord {
            id: format!("{}-{}", ms, seq),
            ms,
            seq,
            fields,
        };

        let position = inner.head + inner.records.len() as u64;
        inner.positions.insert(record.id.clone(), position);
        inner.records.push_back(record.clone());

        while inner.records.len() > inner.max_len {
            if let Some(evicted) = inner.records.pop_front() {
                inner.positions.remove(&evicted.id);
                inner.head += 1;
            }
        }

        // Level-triggered wakeup: blocked readers re-run their scan, so a
        // dropped notification only costs a spurious wake, never a miss.
        inner
            .subscribers
            .retain(|_, sender| !sender.is_closed());
        for sender in inner.subscribers.values() {
            let _ = sender.try_send(());
        }

        Ok(record)
    }

    /// Inclusive scan between two record ids or the `-`/`+` markers.
    async fn range(&self, start: &str, end: &str) -> Result<Vec<StreamRecord>, StreamError> {
        if start == "+" || end == "-" {
            return Err(StreamError::InvalidRangeMarker);
        }

        let inner = self.inner.read().await;

        if inner.records.is_empty() {
            return Ok(Vec::new());
        }

        let start_position = if start == "-" {
            inner.head
        } else {
            match inner.positions.get(start) {
                Some(&position) => position,
                None => return Ok(Vec::new()),
            }
        };

        let end_position = if end == "+" {
            inner.head + inner.records.len() as u64 - 1
        } else {
            match inner.positions.get(end) {
                Some(&position) => position,
                None => return Ok(Vec::new()),
            }
        };

        if end_position < start_position {
            return Ok(Vec::new());
        }

        let first = (start_position - inner.head) as usize;
        let last = (end_position - inner.head) as usize;

        Ok(inner
            .records
            .iter()
            .skip(first)
            .take(last - first + 1)
            .cloned()
            .collect())
    }

    /// Exclusive scan: every record whose `(ms, seq)` is strictly greater
    /// than `after`. `None` reads from the first record.
    async fn read_after(&self, after: Option<(i64, u64)>) -> Vec<StreamRecord> {
        let inner = self.inner.read().await;

        match after {
            None => inner.records.iter().cloned().collect(),
            Some(start) => inner
                .records
                .iter()
                .filter(|record| (record.ms, record.seq) > start)
                .cloned()
                .collect(),
        }
    }

    async fn last_id(&self) -> Option<(i64, u64)> {
        let inner = self.inner.read().await;
        inner.records.back().map(|record| (record.ms, record.seq))
    }

    async fn subscribe(&self) -> (u64, mpsc::Receiver<()>) {
        let mut inner = self.inner.write().await;

        let id = inner.next_subscriber_id;
        inner.next_subscriber_id += 1;

        let (sender, receiver) = mpsc::channel(1);
        inner.subscribers.insert(id, sender);

        (id, receiver)
    }

    async fn unsubscribe(&self, id: u64) {
        let mut inner = self.inner.write().await;
        inner.subscribers.remove(&id);
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }
}

/// The map from stream name to stream. Streams are created lazily by the
/// first XADD; stream names never collide with plain keys because the two
/// stores index disjoint namespaces.
#[derive(Debug, Default)]
pub struct StreamsManager {
    streams: RwLock<HashMap<String, Arc<Stream>>>,
}

impl StreamsManager {
    pub fn new() -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
        }
    }

    pub async fn is_stream(&self, name: &str) -> bool {
        self.streams.read().await.contains_key(name)
    }

    async fn get(&self, name: &str) -> Option<Arc<Stream>> {
        self.streams.read().await.get(name).cloned()
    }

    async fn get_or_create(&self, name: &str) -> Arc<Stream> {
        let mut streams = self.streams.write().await;
        streams
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Stream::new()))
            .clone()
    }

    /// Appends a record, creating the stream on first use. Returns the
    /// record with its resolved id.
    pub async fn xadd(
        &self,
        name: &str,
        id: &str,
        fields: Vec<(String, Bytes)>,
    ) -> Result<StreamRecord, StreamError> {
        let stream = self.get_or_create(name).await;
        stream.add(id, fields).await
    }

    /// Inclusive range scan; `-` and `+` select the first and last record.
    pub async fn xrange(
        &self,
        name: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<StreamRecord>, StreamError> {
        let stream = self.get(name).await.ok_or(StreamError::NoSuchStream)?;
        stream.range(start, end).await
    }

    /// Exclusive scan after `start_id`. `0-0` reads from the first record;
    /// `$` resolves to the current last record.
    pub async fn xread(&self, name: &str, start_id: &str) -> Result<Vec<StreamRecord>, StreamError> {
        let stream = self.get(name).await.ok_or(StreamError::NoSuchStream)?;
        let after = resolve_read_start(&stream, start_id).await?;
        Ok(stream.read_after(after).await)
    }

    /// Long-polling read: returns as soon as records past `start_id` exist,
    /// otherwise waits for an append notification. With `no_timeout` the
    /// wait is unbounded; otherwise an empty result is returned after
    /// `block_ms` milliseconds.
    pub async fn xread_block(
        &self,
        name: &str,
        start_id: &str,
        block_ms: u64,
        no_timeout: bool,
    ) -> Result<Vec<StreamRecord>, StreamError> {
        let stream = self.get(name).await.ok_or(StreamError::NoSuchStream)?;
        let after = resolve_read_start(&stream, start_id).await?;

        let records = stream.read_after(after).await;
        if !records.is_empty() {
            return Ok(records);
        }

        let (subscriber_id, mut notified) = stream.subscribe().await;

        // The notification is level-like: a wake only means "something was
        // appended", so the scan re-runs after every wake and the id gate
        // filters out records at or before the start.
        let records = loop {
            let records = stream.read_after(after).await;
            if !records.is_empty() {
                break records;
            }

            if no_timeout {
                if notified.recv().await.is_none() {
                    break Vec::new();
                }
            } else {
                match tokio::time::timeout(Duration::from_millis(block_ms), notified.recv()).await {
                    Ok(Some(())) => continue,
                    Ok(None) | Err(_) => break Vec::new(),
                }
            }
        };

        stream.unsubscribe(subscriber_id).await;

        Ok(records)
    }
}

async fn resolve_read_start(
    stream: &Stream,
    start_id: &str,
) -> Result<Option<(i64, u64)>, StreamError> {
    if start_id == "0-0" {
        return Ok(None);
    }

    if start_id == "$" {
        return Ok(stream.last_id().await);
    }

    match parse_stream_id(start_id)? {
        RequestedId::Explicit { ms, seq } => Ok(Some((ms, seq))),
        _ => Err(StreamError::InvalidIdFormat),
    }
}

/// Renders records into the canonical nested reply shape:
/// an array of `[id, [field, value, ...]]` entries.
pub fn records_to_resp(records: &[StreamRecord]) -> RespValue {
    let entries = records
        .iter()
        .map(|record| {
            let mut pairs = Vec::with_capacity(record.fields.len() * 2);
            for (field, value) in &record.fields {
                pairs.push(RespValue::bulk(field));
                pairs.push(RespValue::Bulk(value.clone()));
            }

            RespValue::Array(vec![RespValue::bulk(&record.id), RespValue::Array(pairs)])
        })
        .collect();

    RespValue::Array(entries)
}
