//! RESP wire codec.
//!
//! RESP frames a byte stream into typed messages: each frame starts with a
//! one-byte type tag (`+` simple string, `-` error, `:` integer, `$` bulk
//! string, `*` array), an ASCII body, and a terminating CRLF. Bulk strings
//! and arrays carry a decimal length line before their payload; the length
//! `-1` on a bulk string is the distinguished nil value.

use std::io;

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

/// Redis caps bulk strings at 512 MiB.
const MAX_BULK_STRING_LEN: i64 = 512 * 1024 * 1024;

/// Arrays are capped at 1 Mi elements.
const MAX_ARRAY_LEN: i64 = 1024 * 1024;

#[derive(Error, Debug)]
pub enum RespError {
    #[error("unknown RESP type: {0:#04x}")]
    UnknownType(u8),
    #[error("bulk string length exceeds limit")]
    BulkStringTooLarge,
    #[error("array length exceeds limit")]
    ArrayTooLarge,
    #[error("invalid length line")]
    InvalidLength,
    #[error("failed to parse integer")]
    InvalidInteger,
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,
    #[error("expected CRLF after bulk string payload")]
    MissingCrlf,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RespError {
    /// True when the underlying stream reached EOF at a frame boundary,
    /// which is how a client signals a clean disconnect.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, RespError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    /// The nil bulk string, encoded as `$-1\r\n`.
    Null,
    Array(Vec<RespValue>),
}

impl RespValue {
    pub fn simple(value: impl Into<String>) -> Self {
        RespValue::SimpleString(value.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        RespValue::Error(message.into())
    }

    pub fn bulk(data: impl AsRef<[u8]>) -> Self {
        RespValue::Bulk(Bytes::copy_from_slice(data.as_ref()))
    }
}

/// Decodes RESP frames from an async byte stream.
///
/// The reader owns a buffered wrapper around the stream so that the
/// byte-at-a-time line scanning does not hit the socket for every byte.
pub struct RespReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> RespReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
        }
    }

    /// Reads one complete frame.
    ///
    /// The first byte selects the frame kind; arrays recurse into their
    /// children. Any I/O error propagates to the caller.
    pub async fn decode(&mut self) -> Result<RespValue, RespError> {
        let tag = self.reader.read_u8().await?;

        match tag {
            b'+' => Ok(RespValue::SimpleString(self.read_line().await?)),
            b'-' => Ok(RespValue::Error(self.read_line().await?)),
            b':' => {
                let line = self.read_line().await?;
                let value = line.parse::<i64>().map_err(|_| RespError::InvalidInteger)?;
                Ok(RespValue::Integer(value))
            }
            b'$' => self.decode_bulk_string().await,
            b'*' => self.decode_array().await,
            other => Err(RespError::UnknownType(other)),
        }
    }

    async fn decode_bulk_string(&mut self) -> Result<RespValue, RespError> {
        let length = self.read_length().await?;

        if length > MAX_BULK_STRING_LEN {
            return Err(RespError::BulkStringTooLarge);
        }

        // -1 is the canonical nil and carries nothing further on the wire.
        if length < 0 {
            return Ok(RespValue::Null);
        }

        // A zero-length bulk still has its CRLF terminator to consume.
        if length == 0 {
            let mut crlf = [0u8; 2];
            self.reader.read_exact(&mut crlf).await?;
            if crlf != *b"\r\n" {
                return Err(RespError::MissingCrlf);
            }
            return Ok(RespValue::Null);
        }

        let mut payload = vec![0u8; length as usize];
        self.reader.read_exact(&mut payload).await?;

        let mut crlf = [0u8; 2];
        self.reader.read_exact(&mut crlf).await?;
        if crlf != *b"\r\n" {
            return Err(RespError::MissingCrlf);
        }

        Ok(RespValue::Bulk(Bytes::from(payload)))
    }

    async fn decode_array(&mut self) -> Result<RespValue, RespError> {
        let length = self.read_length().await?;

        if length > MAX_ARRAY_LEN {
            return Err(RespError::ArrayTooLarge);
        }

        if length < 0 {
            return Ok(RespValue::Null);
        }

        let mut elements = Vec::with_capacity(length as usize);
        for _ in 0..length {
            let element = Box::pin(self.decode()).await?;
            elements.push(element);
        }

        Ok(RespValue::Array(elements))
    }

    /// Reads bytes until CRLF and returns the body without the terminator.
    async fn read_line(&mut self) -> Result<String, RespError> {
        let mut line: Vec<u8> = Vec::new();

        loop {
            let byte = self.reader.read_u8().await?;
            line.push(byte);

            if line.len() >= 2 && line[line.len() - 2..] == *b"\r\n" {
                break;
            }
        }

        line.truncate(line.len() - 2);
        String::from_utf8(line).map_err(|_| RespError::InvalidUtf8)
    }

    async fn read_length(&mut self) -> Result<i64, RespError> {
        let line = self.read_line().await?;
        line.parse::<i64>().map_err(|_| RespError::InvalidLength)
    }
}

/// Encodes RESP frames onto an async byte stream.
pub struct RespWriter<W> {
    writer: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> RespWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
        }
    }

    /// Writes one complete frame and flushes so the client sees the reply
    /// without waiting for further output.
    pub async fn encode(&mut self, value: &RespValue) -> io::Result<()> {
        self.write_value(value).await?;
        self.writer.flush().await
    }

    async fn write_value(&mut self, value: &RespValue) -> io::Result<()> {
        match value {
            RespValue::SimpleString(body) => self.write_line(b'+', body.as_bytes()).await,
            RespValue::Error(body) => self.write_line(b'-', body.as_bytes()).await,
            RespValue::Integer(n) => self.write_line(b':', n.to_string().as_bytes()).await,
            RespValue::Null => self.writer.write_all(b"$-1\r\n").await,
            RespValue::Bulk(payload) => {
                self.write_line(b'$', payload.len().to_string().as_bytes())
                    .await?;
                self.writer.write_all(payload).await?;
                self.writer.write_all(b"\r\n").await
            }
            RespValue::Array(elements) => {
                self.write_line(b'*', elements.len().to_string().as_bytes())
                    .await?;
                for element in elements {
                    Box::pin(self.write_value(element)).await?;
                }
                Ok(())
            }
        }
    }

    async fn write_line(&mut self, tag: u8, body: &[u8]) -> io::Result<()> {
        self.writer.write_u8(tag).await?;
        self.writer.write_all(body).await?;
        self.writer.write_all(b"\r\n").await
    }

    /// Consumes the writer, returning the underlying stream. Callers must
    /// have flushed (every `encode` does) or buffered bytes are lost.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}
