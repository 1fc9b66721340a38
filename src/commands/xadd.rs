use bytes::Bytes;

use crate::resp::RespValue;
use crate::store::Store;
use crate::transactions::TxManager;

use super::arguments::{bytes_arg, string_arg};
use super::CommandError;

/// Parsed `XADD stream id field value [field value ...]`.
///
/// Field/value pairs keep their argument order; the reply shape exposes
/// them in the same order they were supplied.
struct XaddArguments {
    key: String,
    id: String,
    fields: Vec<(String, Bytes)>,
}

impl XaddArguments {
    fn parse(args: &[RespValue]) -> Result<Self, CommandError> {
        if args.len() < 4 || (args.len() - 2) % 2 != 0 {
            return Err(CommandError::WrongNumberOfArguments("XADD"));
        }

        let key = string_arg(args, 0, "XADD")?;
        let id = string_arg(args, 1, "XADD")?;

        let mut fields = Vec::with_capacity((args.len() - 2) / 2);
        let mut index = 2;
        while index < args.len() {
            let field = string_arg(args, index, "XADD")?;
            let value = bytes_arg(args, index + 1, "XADD")?;
            fields.push((field, value));
            index += 2;
        }

        Ok(Self { key, id, fields })
    }
}

/// XADD appends an entry to a stream, creating the stream on first use, and
/// replies with the resolved entry id.
pub async fn xadd(
    store: &Store,
    transactions: &TxManager,
    args: &[RespValue],
) -> Result<RespValue, CommandError> {
    let parsed = XaddArguments::parse(args)?;

    let record = store.xadd(&parsed.key, &parsed.id, parsed.fields).await?;
    transactions.publish_write(&parsed.key).await;

    Ok(RespValue::bulk(&record.id))
}
