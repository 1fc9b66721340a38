//! Snapshot loading through a real file: parse, apply to the store, honor
//! the remaining TTLs.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use redlite::rdb::RdbParser;
use redlite::store::Store;

fn length_string(data: &[u8]) -> Vec<u8> {
    let mut out = vec![data.len() as u8];
    out.extend_from_slice(data);
    out
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

fn build_snapshot() -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"REDIS0011");

    bytes.push(0xFA);
    bytes.extend_from_slice(&length_string(b"redis-ver"));
    bytes.extend_from_slice(&length_string(b"7.2.0"));

    bytes.push(0xFE);
    bytes.push(0x00);
    bytes.push(0xFB);
    bytes.push(0x03);
    bytes.push(0x02);

    // Plain entry.
    bytes.push(0x00);
    bytes.extend_from_slice(&length_string(b"foo"));
    bytes.extend_from_slice(&length_string(b"bar"));

    // Entry expiring a minute from now.
    bytes.push(0xFC);
    bytes.extend_from_slice(&(now_millis() + 60_000).to_le_bytes());
    bytes.push(0x00);
    bytes.extend_from_slice(&length_string(b"short"));
    bytes.extend_from_slice(&length_string(b"lived"));

    // Entry that expired a minute ago; must be dropped on load.
    bytes.push(0xFC);
    bytes.extend_from_slice(&(now_millis() - 60_000).to_le_bytes());
    bytes.push(0x00);
    bytes.extend_from_slice(&length_string(b"stale"));
    bytes.extend_from_slice(&length_string(b"gone"));

    bytes.push(0xFF);
    bytes.extend_from_slice(&[0u8; 8]);
    bytes
}

#[tokio::test]
async fn test_snapshot_file_rehydrates_the_store() {
    let path = std::env::temp_dir().join(format!("redlite-test-{}.rdb", std::process::id()));
    std::fs::write(&path, build_snapshot()).unwrap();

    let mut parser = RdbParser::new();
    let entries = parser.parse(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let store = Store::new();
    for entry in entries {
        store.set(&entry.key, entry.value, entry.ttl).await;
    }

    assert_eq!(
        store.get("foo").await.as_deref(),
        Some(b"bar".as_slice())
    );
    assert_eq!(
        store.get("short").await.as_deref(),
        Some(b"lived".as_slice())
    );
    assert_eq!(store.get("stale").await, None);

    assert_eq!(parser.version.as_deref(), Some("0011"));
    assert_eq!(
        parser.metadata.get("redis-ver").map(String::as_str),
        Some("7.2.0")
    );
}

#[tokio::test]
async fn test_loaded_ttl_still_expires() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"REDIS0011");
    bytes.push(0xFE);
    bytes.push(0x00);
    bytes.push(0xFB);
    bytes.push(0x01);
    bytes.push(0x01);

    bytes.push(0xFC);
    bytes.extend_from_slice(&(now_millis() + 60).to_le_bytes());
    bytes.push(0x00);
    bytes.extend_from_slice(&length_string(b"blink"));
    bytes.extend_from_slice(&length_string(b"v"));

    bytes.push(0xFF);
    bytes.extend_from_slice(&[0u8; 8]);

    let entries = RdbParser::new().parse_bytes(&bytes).unwrap();
    let store = Store::new();
    for entry in entries {
        store.set(&entry.key, entry.value, entry.ttl).await;
    }

    assert!(store.get("blink").await.is_some());
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(store.get("blink").await, None);
}
