use crate::resp::RespValue;
use crate::store::Store;

use super::arguments::string_arg;
use super::CommandError;

/// TYPE reports `string` for live plain keys, `stream` for stream names,
/// and `none` otherwise.
pub async fn type_of(store: &Store, args: &[RespValue]) -> Result<RespValue, CommandError> {
    if args.len() != 1 {
        return Err(CommandError::WrongNumberOfArguments("TYPE"));
    }

    let key = string_arg(args, 0, "TYPE")?;

    let kind = if store.contains_key(&key).await {
        "string"
    } else if store.is_stream(&key).await {
        "stream"
    } else {
        "none"
    };

    Ok(RespValue::simple(kind))
}
