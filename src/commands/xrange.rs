use crate::resp::RespValue;
use crate::store::{records_to_resp, Store};

use super::arguments::string_arg;
use super::CommandError;

/// XRANGE returns the inclusive slice of a stream between two ids; `-` and
/// `+` stand for the first and last record.
pub async fn xrange(store: &Store, args: &[RespValue]) -> Result<RespValue, CommandError> {
    if args.len() != 3 {
        return Err(CommandError::WrongNumberOfArguments("XRANGE"));
    }

    let key = string_arg(args, 0, "XRANGE")?;
    let start = string_arg(args, 1, "XRANGE")?;
    let end = string_arg(args, 2, "XRANGE")?;

    let records = store.xrange(&key, &start, &end).await?;
    Ok(records_to_resp(&records))
}
