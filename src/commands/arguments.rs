//! Helpers for unpacking bulk-string command arguments.

use bytes::Bytes;

use crate::resp::RespValue;

use super::CommandError;

/// Returns the argument at `index` as an owned string, or the arity error
/// for `command` when it is missing.
pub(super) fn string_arg(
    args: &[RespValue],
    index: usize,
    command: &'static str,
) -> Result<String, CommandError> {
    match args.get(index) {
        Some(RespValue::Bulk(payload)) => Ok(String::from_utf8_lossy(payload).into_owned()),
        // The nil bulk string carries an empty value.
        Some(RespValue::Null) => Ok(String::new()),
        Some(_) => Err(CommandError::SyntaxError),
        None => Err(CommandError::WrongNumberOfArguments(command)),
    }
}

/// Returns the argument at `index` as raw bytes; values stay binary-safe.
pub(super) fn bytes_arg(
    args: &[RespValue],
    index: usize,
    command: &'static str,
) -> Result<Bytes, CommandError> {
    match args.get(index) {
        Some(RespValue::Bulk(payload)) => Ok(payload.clone()),
        Some(RespValue::Null) => Ok(Bytes::new()),
        Some(_) => Err(CommandError::SyntaxError),
        None => Err(CommandError::WrongNumberOfArguments(command)),
    }
}
