use crate::resp::RespValue;

use super::arguments::bytes_arg;
use super::CommandError;

/// ECHO returns its argument verbatim as a bulk string.
pub fn echo(args: &[RespValue]) -> Result<RespValue, CommandError> {
    let message = bytes_arg(args, 0, "ECHO")?;
    Ok(RespValue::Bulk(message))
}
