use crate::resp::RespValue;
use crate::transactions::TxManager;

use super::arguments::string_arg;
use super::CommandError;

/// MULTI opens a transaction; every following non-control command is queued
/// until EXEC or DISCARD.
pub async fn multi(
    transactions: &TxManager,
    client_id: &str,
    args: &[RespValue],
) -> Result<RespValue, CommandError> {
    if !args.is_empty() {
        return Err(CommandError::WrongNumberOfArguments("MULTI"));
    }

    transactions.multi(client_id).await?;
    Ok(RespValue::simple("OK"))
}

/// DISCARD drops the queued commands and the client's watches.
pub async fn discard(
    transactions: &TxManager,
    client_id: &str,
    args: &[RespValue],
) -> Result<RespValue, CommandError> {
    if !args.is_empty() {
        return Err(CommandError::WrongNumberOfArguments("DISCARD"));
    }

    transactions.discard(client_id).await?;
    Ok(RespValue::simple("OK"))
}

/// WATCH records the current version of each named key for the CAS check
/// at EXEC time.
pub async fn watch(
    transactions: &TxManager,
    client_id: &str,
    args: &[RespValue],
) -> Result<RespValue, CommandError> {
    if args.is_empty() {
        return Err(CommandError::WrongNumberOfArguments("WATCH"));
    }

    for index in 0..args.len() {
        let key = string_arg(args, index, "WATCH")?;
        transactions.watch(client_id, &key).await;
    }

    Ok(RespValue::simple("OK"))
}

/// UNWATCH forgets every key the client was watching.
pub async fn unwatch(
    transactions: &TxManager,
    client_id: &str,
    args: &[RespValue],
) -> Result<RespValue, CommandError> {
    if !args.is_empty() {
        return Err(CommandError::WrongNumberOfArguments("UNWATCH"));
    }

    transactions.unwatch(client_id).await;
    Ok(RespValue::simple("OK"))
}
