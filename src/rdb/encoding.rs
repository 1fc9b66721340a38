//! Low-level readers for the RDB length and string encodings.

use std::fmt;

/// Internal corruption marker; the section parsers map it onto the coarse
/// public error for whichever section was being read.
#[derive(Debug, PartialEq)]
pub(crate) struct Corrupt(pub &'static str);

impl fmt::Display for Corrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Byte cursor over the snapshot contents.
pub(crate) struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn u8(&mut self) -> Result<u8, Corrupt> {
        let byte = *self.bytes.get(self.pos).ok_or(Corrupt("unexpected EOF"))?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], Corrupt> {
        if self.pos + n > self.bytes.len() {
            return Err(Corrupt("unexpected EOF"));
        }

        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn unread(&mut self) {
        self.pos -= 1;
    }
}

/// Outcome of reading a length byte: either an actual length, or the marker
/// that a specially encoded string follows (the marker byte is unread so the
/// string decoder sees it again).
#[derive(Debug, PartialEq)]
pub(crate) enum Length {
    Plain(usize),
    EncodedString,
}

/// Reads the 1-5 byte length encoding.
///
/// The top two bits select the shape: `00` six-bit length, `01` fourteen-bit
/// big-endian length, `10` four-byte big-endian length, `11` special string
/// encoding.
pub(crate) fn read_length(cursor: &mut Cursor<'_>) -> Result<Length, Corrupt> {
    let byte = cursor.u8()?;

    match byte >> 6 {
        0b00 => Ok(Length::Plain((byte & 0x3F) as usize)),
        0b01 => {
            let low = cursor.u8()?;
            Ok(Length::Plain((((byte & 0x3F) as usize) << 8) | low as usize))
        }
        0b10 => {
            let buf: [u8; 4] = cursor.take(4)?.try_into().expect("exactly four bytes");
            Ok(Length::Plain(u32::from_be_bytes(buf) as usize))
        }
        _ => {
            cursor.unread();
            Ok(Length::EncodedString)
        }
    }
}

/// Reads a length that must be an actual number, as used for the database
/// index and hash-table sizes.
pub(crate) fn read_plain_length(cursor: &mut Cursor<'_>) -> Result<usize, Corrupt> {
    match read_length(cursor)? {
        Length::Plain(length) => Ok(length),
        Length::EncodedString => Err(Corrupt("expected a plain length")),
    }
}

/// Reads a string: either `length` raw bytes, or one of the special integer
/// encodings serialized back to its decimal form.
pub(crate) fn read_string(cursor: &mut Cursor<'_>) -> Result<Vec<u8>, Corrupt> {
    match read_length(cursor)? {
        Length::Plain(length) => Ok(cursor.take(length)?.to_vec()),
        Length::EncodedString => read_encoded_string(cursor),
    }
}

fn read_encoded_string(cursor: &mut Cursor<'_>) -> Result<Vec<u8>, Corrupt> {
    match cursor.u8()? {
        0xC0 => {
            let value = cursor.u8()?;
            Ok(value.to_string().into_bytes())
        }
        0xC1 => {
            let buf: [u8; 2] = cursor.take(2)?.try_into().expect("exactly two bytes");
            Ok(u16::from_le_bytes(buf).to_string().into_bytes())
        }
        0xC2 => {
            // Full 32-bit little-endian integer.
            let buf: [u8; 4] = cursor.take(4)?.try_into().expect("exactly four bytes");
            Ok(u32::from_le_bytes(buf).to_string().into_bytes())
        }
        _ => Err(Corrupt("unknown special string encoding")),
    }
}
