use bytes::Bytes;

use crate::resp::RespValue;
use crate::store::Store;
use crate::transactions::TxManager;

use super::arguments::string_arg;
use super::CommandError;

/// INCR increments the integer stored at a key by one, creating the key
/// with `1` when absent. Non-numeric values are rejected.
pub async fn incr(
    store: &Store,
    transactions: &TxManager,
    args: &[RespValue],
) -> Result<RespValue, CommandError> {
    if args.len() != 1 {
        return Err(CommandError::WrongNumberOfArguments("INCR"));
    }

    let key = string_arg(args, 0, "INCR")?;

    let Some(current) = store.get(&key).await else {
        store.set(&key, Bytes::from_static(b"1"), None).await;
        transactions.publish_write(&key).await;
        return Ok(RespValue::Integer(1));
    };

    let current = std::str::from_utf8(&current)
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .ok_or(CommandError::ValueNotAnInteger)?;

    let incremented = current
        .checked_add(1)
        .ok_or(CommandError::ValueNotAnInteger)?;

    store
        .set(&key, Bytes::from(incremented.to_string().into_bytes()), None)
        .await;
    transactions.publish_write(&key).await;

    Ok(RespValue::Integer(incremented))
}
