use crate::resp::RespValue;
use crate::store::Store;

use super::arguments::string_arg;
use super::CommandError;

/// GET returns the live value for a key, or nil when absent or expired.
pub async fn get(store: &Store, args: &[RespValue]) -> Result<RespValue, CommandError> {
    if args.len() != 1 {
        return Err(CommandError::WrongNumberOfArguments("GET"));
    }

    let key = string_arg(args, 0, "GET")?;

    match store.get(&key).await {
        Some(value) => Ok(RespValue::Bulk(value)),
        None => Ok(RespValue::Null),
    }
}
