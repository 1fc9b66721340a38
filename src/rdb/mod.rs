//! RDB snapshot loader.
//!
//! Parses the length-prefixed binary snapshot format in a single pass:
//! a `REDIS<version>` header, metadata records, then one database section
//! whose entries rehydrate the key/value store at startup.

mod encoding;
mod parser;

use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

pub use parser::RdbParser;

#[derive(Error, Debug)]
pub enum RdbError {
    #[error("invalid RDB header")]
    InvalidHeader,
    #[error("invalid RDB metadata")]
    InvalidMetadata,
    #[error("invalid RDB database")]
    InvalidDatabase,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One rehydrated key: the remaining time to live has already been computed
/// from the absolute expiry in the file; entries that were found expired are
/// never produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RdbEntry {
    pub key: String,
    pub value: Bytes,
    pub ttl: Option<Duration>,
}
