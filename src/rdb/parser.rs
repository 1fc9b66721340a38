use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use jiff::Timestamp;
use tracing::debug;

use super::encoding::{read_plain_length, read_string, Corrupt, Cursor};
use super::{RdbEntry, RdbError};

const OPCODE_METADATA: u8 = 0xFA;
const OPCODE_RESIZE_DB: u8 = 0xFB;
const OPCODE_EXPIRE_MS: u8 = 0xFC;
const OPCODE_EXPIRE_S: u8 = 0xFD;
const OPCODE_DB_START: u8 = 0xFE;
const OPCODE_EOF: u8 = 0xFF;
const OPCODE_MODULE_AUX: u8 = 0xF7;
const TYPE_STRING: u8 = 0x00;

/// Single-pass snapshot parser.
///
/// `parse` walks header, metadata, and database sections in order and
/// returns the surviving entries; header fields and metadata stay on the
/// parser for inspection.
#[derive(Debug, Default)]
pub struct RdbParser {
    pub version: Option<String>,
    pub metadata: HashMap<String, String>,
    pub database_index: Option<usize>,
    pub table_size: Option<usize>,
    pub expire_table_size: Option<usize>,
}

impl RdbParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&mut self, path: &Path) -> Result<Vec<RdbEntry>, RdbError> {
        let bytes = std::fs::read(path)?;
        self.parse_bytes(&bytes)
    }

    pub fn parse_bytes(&mut self, bytes: &[u8]) -> Result<Vec<RdbEntry>, RdbError> {
        let mut cursor = Cursor::new(bytes);

        self.parse_header(&mut cursor).map_err(|e| {
            debug!(error = %e, "snapshot header rejected");
            RdbError::InvalidHeader
        })?;

        self.parse_metadata(&mut cursor).map_err(|e| {
            debug!(error = %e, "snapshot metadata rejected");
            RdbError::InvalidMetadata
        })?;

        self.parse_database(&mut cursor).map_err(|e| {
            debug!(error = %e, "snapshot database rejected");
            RdbError::InvalidDatabase
        })
    }

    fn parse_header(&mut self, cursor: &mut Cursor<'_>) -> Result<(), Corrupt> {
        let magic = cursor.take(5)?;
        if magic != b"REDIS" {
            return Err(Corrupt("bad magic string"));
        }

        let version = cursor.take(4)?;
        if !version.iter().all(u8::is_ascii_digit) {
            return Err(Corrupt("bad version digits"));
        }

        self.version = Some(String::from_utf8_lossy(version).into_owned());
        Ok(())
    }

    fn parse_metadata(&mut self, cursor: &mut Cursor<'_>) -> Result<(), Corrupt> {
        while cursor.peek() == Some(OPCODE_METADATA) {
            cursor.u8()?;

            let key = read_string(cursor)?;
            let value = read_string(cursor)?;

            self.metadata.insert(
                String::from_utf8_lossy(&key).into_owned(),
                String::from_utf8_lossy(&value).into_owned(),
            );
        }

        Ok(())
    }

    fn parse_database(&mut self, cursor: &mut Cursor<'_>) -> Result<Vec<RdbEntry>, Corrupt> {
        // Anything between metadata and the database selector is skipped.
        loop {
            if cursor.u8()? == OPCODE_DB_START {
                break;
            }
        }

        self.database_index = Some(read_plain_length(cursor)?);

        if cursor.u8()? != OPCODE_RESIZE_DB {
            return Err(Corrupt("expected hash table size delimiter"));
        }
        self.table_size = Some(read_plain_length(cursor)?);
        self.expire_table_size = Some(read_plain_length(cursor)?);

        let mut entries = Vec::new();

        loop {
            match cursor.u8()? {
                TYPE_STRING => {
                    if let Some(entry) = read_entry(cursor, None)? {
                        entries.push(entry);
                    }
                }
                OPCODE_EXPIRE_MS => {
                    let buf: [u8; 8] = cursor.take(8)?.try_into().expect("exactly eight bytes");
                    let expire_at_ms = i64::from_le_bytes(buf);

                    expect_string_type(cursor)?;
                    if let Some(entry) = read_entry(cursor, Some(expire_at_ms))? {
                        entries.push(entry);
                    }
                }
                OPCODE_EXPIRE_S => {
                    let buf: [u8; 4] = cursor.take(4)?.try_into().expect("exactly four bytes");
                    let expire_at_ms = i64::from(u32::from_le_bytes(buf)) * 1000;

                    expect_string_type(cursor)?;
                    if let Some(entry) = read_entry(cursor, Some(expire_at_ms))? {
                        entries.push(entry);
                    }
                }
                // Module auxiliary data carries nothing we load; everything
                // up to EOF is abandoned.
                OPCODE_MODULE_AUX => break,
                OPCODE_EOF => break,
                _ => return Err(Corrupt("unknown entry type")),
            }
        }

        Ok(entries)
    }
}

fn expect_string_type(cursor: &mut Cursor<'_>) -> Result<(), Corrupt> {
    if cursor.u8()? != TYPE_STRING {
        return Err(Corrupt("expected string value type after expiry"));
    }
    Ok(())
}

/// Reads one key/value pair. An absolute expiry is converted to a remaining
/// TTL; entries already expired are dropped and `None` is returned.
fn read_entry(
    cursor: &mut Cursor<'_>,
    expire_at_ms: Option<i64>,
) -> Result<Option<RdbEntry>, Corrupt> {
    let key = read_string(cursor)?;
    let value = read_string(cursor)?;

    let ttl = match expire_at_ms {
        None => None,
        Some(expire_at_ms) => {
            let remaining_ms = expire_at_ms - Timestamp::now().as_millisecond();
            if remaining_ms < 0 {
                return Ok(None);
            }
            Some(Duration::from_millis(remaining_ms as u64))
        }
    };

    Ok(Some(RdbEntry {
        key: String::from_utf8_lossy(&key).into_owned(),
        value: Bytes::from(value),
        ttl,
    }))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use jiff::Timestamp;

    use super::super::{RdbError, RdbParser};

    fn length_string(data: &[u8]) -> Vec<u8> {
        let mut out = vec![data.len() as u8];
        out.extend_from_slice(data);
        out
    }

    /// A snapshot with one metadata record and the given database entries.
    fn snapshot(entries: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"REDIS0011");

        bytes.push(0xFA);
        bytes.extend_from_slice(&length_string(b"redis-ver"));
        bytes.extend_from_slice(&length_string(b"7.2.0"));

        bytes.push(0xFE);
        bytes.push(0x00);
        bytes.push(0xFB);
        bytes.push(0x02);
        bytes.push(0x01);

        bytes.extend_from_slice(entries);
        bytes.push(0xFF);
        bytes.extend_from_slice(&[0u8; 8]);
        bytes
    }

    #[test]
    fn test_parse_plain_entry() {
        let mut entry = vec![0x00];
        entry.extend_from_slice(&length_string(b"foo"));
        entry.extend_from_slice(&length_string(b"bar"));

        let mut parser = RdbParser::new();
        let entries = parser.parse_bytes(&snapshot(&entry)).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "foo");
        assert_eq!(&entries[0].value[..], b"bar");
        assert_eq!(entries[0].ttl, None);

        assert_eq!(parser.version.as_deref(), Some("0011"));
        assert_eq!(parser.metadata.get("redis-ver").map(String::as_str), Some("7.2.0"));
        assert_eq!(parser.database_index, Some(0));
        assert_eq!(parser.table_size, Some(2));
        assert_eq!(parser.expire_table_size, Some(1));
    }

    #[test]
    fn test_parse_entry_with_future_expiry() {
        let expire_at = Timestamp::now().as_millisecond() + 60_000;

        let mut entry = vec![0xFC];
        entry.extend_from_slice(&expire_at.to_le_bytes());
        entry.push(0x00);
        entry.extend_from_slice(&length_string(b"tmp"));
        entry.extend_from_slice(&length_string(b"v"));

        let entries = RdbParser::new().parse_bytes(&snapshot(&entry)).unwrap();

        assert_eq!(entries.len(), 1);
        let ttl = entries[0].ttl.expect("expiring key keeps a ttl");
        assert!(ttl <= Duration::from_millis(60_000));
        assert!(ttl >= Duration::from_millis(50_000));
    }

    #[test]
    fn test_expired_entry_is_dropped() {
        let expire_at = Timestamp::now().as_millisecond() - 1_000;

        let mut entry = vec![0xFC];
        entry.extend_from_slice(&expire_at.to_le_bytes());
        entry.push(0x00);
        entry.extend_from_slice(&length_string(b"old"));
        entry.extend_from_slice(&length_string(b"x"));

        let entries = RdbParser::new().parse_bytes(&snapshot(&entry)).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_seconds_expiry_entry() {
        let expire_at_s = (Timestamp::now().as_millisecond() / 1000 + 120) as u32;

        let mut entry = vec![0xFD];
        entry.extend_from_slice(&expire_at_s.to_le_bytes());
        entry.push(0x00);
        entry.extend_from_slice(&length_string(b"later"));
        entry.extend_from_slice(&length_string(b"v"));

        let entries = RdbParser::new().parse_bytes(&snapshot(&entry)).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].ttl.unwrap() > Duration::from_millis(110_000));
    }

    #[test]
    fn test_encoded_integer_value() {
        let mut entry = vec![0x00];
        entry.extend_from_slice(&length_string(b"count"));
        entry.extend_from_slice(&[0xC2, 0x40, 0x42, 0x0F, 0x00]);

        let entries = RdbParser::new().parse_bytes(&snapshot(&entry)).unwrap();
        assert_eq!(&entries[0].value[..], b"1000000");
    }

    #[test]
    fn test_module_aux_stops_parsing() {
        let mut entry = vec![0x00];
        entry.extend_from_slice(&length_string(b"foo"));
        entry.extend_from_slice(&length_string(b"bar"));
        entry.push(0xF7);
        entry.extend_from_slice(b"opaque module payload");

        // The trailing EOF marker from `snapshot` is never reached; parsing
        // stops cleanly at the module marker.
        let entries = RdbParser::new().parse_bytes(&snapshot(&entry)).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_invalid_header() {
        let result = RdbParser::new().parse_bytes(b"NOTRDB0011");
        assert!(matches!(result, Err(RdbError::InvalidHeader)));
    }

    #[test]
    fn test_truncated_metadata() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"REDIS0011");
        bytes.push(0xFA);
        bytes.push(0x09);

        let result = RdbParser::new().parse_bytes(&bytes);
        assert!(matches!(result, Err(RdbError::InvalidMetadata)));
    }

    #[test]
    fn test_corrupt_database_section() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"REDIS0011");
        bytes.push(0xFE);
        bytes.push(0x00);
        // Missing the 0xFB size delimiter.
        bytes.push(0x00);

        let result = RdbParser::new().parse_bytes(&bytes);
        assert!(matches!(result, Err(RdbError::InvalidDatabase)));
    }
}
