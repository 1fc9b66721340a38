use std::time::Duration;

use bytes::Bytes;

use crate::resp::RespValue;
use crate::store::Store;
use crate::transactions::TxManager;

use super::arguments::{bytes_arg, string_arg};
use super::CommandError;

#[derive(Debug, Clone, Copy, PartialEq)]
enum SetCondition {
    /// NX: only set when the key is absent.
    IfAbsent,
    /// XX: only set when the key already exists.
    IfPresent,
}

/// Parsed `SET key value [EX s | PX ms] [NX | XX]`.
///
/// EX and PX both land in `expire`; when a client sends both, the last one
/// wins, matching the option scan order.
struct SetArguments {
    key: String,
    value: Bytes,
    expire: Option<Duration>,
    condition: Option<SetCondition>,
}

impl SetArguments {
    fn parse(args: &[RespValue]) -> Result<Self, CommandError> {
        if args.len() < 2 {
            return Err(CommandError::WrongNumberOfArguments("SET"));
        }

        let key = string_arg(args, 0, "SET")?;
        let value = bytes_arg(args, 1, "SET")?;

        let mut expire = None;
        let mut condition = None;

        let mut index = 2;
        while index < args.len() {
            let option = string_arg(args, index, "SET")?.to_uppercase();

            match option.as_str() {
                "EX" => {
                    let seconds = string_arg(args, index + 1, "SET")?
                        .parse::<u64>()
                        .map_err(|_| CommandError::InvalidExpireTime)?;
                    expire = Some(Duration::from_secs(seconds));
                    index += 2;
                }
                "PX" => {
                    let milliseconds = string_arg(args, index + 1, "SET")?
                        .parse::<u64>()
                        .map_err(|_| CommandError::InvalidExpireTime)?;
                    expire = Some(Duration::from_millis(milliseconds));
                    index += 2;
                }
                "NX" => {
                    condition = Some(SetCondition::IfAbsent);
                    index += 1;
                }
                "XX" => {
                    condition = Some(SetCondition::IfPresent);
                    index += 1;
                }
                _ => return Err(CommandError::SyntaxError),
            }
        }

        Ok(Self {
            key,
            value,
            expire,
            condition,
        })
    }
}

/// SET stores a value, optionally with a TTL, and publishes the write to
/// any transaction watching the key.
pub async fn set(
    store: &Store,
    transactions: &TxManager,
    args: &[RespValue],
) -> Result<RespValue, CommandError> {
    let parsed = SetArguments::parse(args)?;

    match parsed.condition {
        Some(SetCondition::IfAbsent) if store.contains_key(&parsed.key).await => {
            return Ok(RespValue::Null);
        }
        Some(SetCondition::IfPresent) if !store.contains_key(&parsed.key).await => {
            return Ok(RespValue::Null);
        }
        _ => {}
    }

    store.set(&parsed.key, parsed.value, parsed.expire).await;
    transactions.publish_write(&parsed.key).await;

    Ok(RespValue::simple("OK"))
}
