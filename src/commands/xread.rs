use crate::resp::RespValue;
use crate::store::{records_to_resp, Store, StreamRecord};

use super::arguments::string_arg;
use super::CommandError;

/// Parsed `XREAD [BLOCK ms] [COUNT n] STREAMS name... id...`.
///
/// The STREAMS block always comes last; the ids run parallel to the names.
struct XreadArguments {
    block_ms: Option<u64>,
    count: Option<usize>,
    streams: Vec<(String, String)>,
}

impl XreadArguments {
    fn parse(args: &[RespValue]) -> Result<Self, CommandError> {
        if args.len() < 3 {
            return Err(CommandError::WrongNumberOfArguments("XREAD"));
        }

        let mut block_ms = None;
        let mut count = None;
        let mut streams_start = None;

        let mut index = 0;
        while index < args.len() {
            let option = string_arg(args, index, "XREAD")?.to_uppercase();

            match option.as_str() {
                "BLOCK" => {
                    let value = string_arg(args, index + 1, "XREAD")
                        .map_err(|_| CommandError::SyntaxError)?;
                    block_ms = Some(
                        value
                            .parse::<u64>()
                            .map_err(|_| CommandError::InvalidBlockTime)?,
                    );
                    index += 2;
                }
                "COUNT" => {
                    let value = string_arg(args, index + 1, "XREAD")
                        .map_err(|_| CommandError::SyntaxError)?;
                    count = Some(
                        value
                            .parse::<usize>()
                            .map_err(|_| CommandError::InvalidCount)?,
                    );
                    index += 2;
                }
                "STREAMS" => {
                    streams_start = Some(index + 1);
                    break;
                }
                _ => index += 1,
            }
        }

        let streams_start = streams_start.ok_or(CommandError::SyntaxError)?;

        let remaining = &args[streams_start..];
        if remaining.is_empty() || remaining.len() % 2 != 0 {
            return Err(CommandError::WrongNumberOfArguments("XREAD"));
        }

        let stream_count = remaining.len() / 2;
        let mut streams = Vec::with_capacity(stream_count);
        for position in 0..stream_count {
            let name = string_arg(remaining, position, "XREAD")?;
            let id = string_arg(remaining, stream_count + position, "XREAD")?;
            streams.push((name, id));
        }

        Ok(Self {
            block_ms,
            count,
            streams,
        })
    }
}

/// XREAD returns, per stream, the records strictly after the given id.
///
/// With BLOCK the read long-polls: `BLOCK 0` waits until data arrives,
/// `BLOCK n` gives up after n milliseconds and replies nil. Streams that do
/// not exist or have nothing new are omitted from the reply.
pub async fn xread(store: &Store, args: &[RespValue]) -> Result<RespValue, CommandError> {
    let parsed = XreadArguments::parse(args)?;

    let mut reply = Vec::with_capacity(parsed.streams.len());

    for (name, start_id) in &parsed.streams {
        let result = match parsed.block_ms {
            Some(block_ms) => {
                store
                    .xread_block(name, start_id, block_ms, block_ms == 0)
                    .await
            }
            None => store.xread(name, start_id).await,
        };

        // A missing or invalid stream is skipped; the remaining streams
        // still produce their slices.
        let Ok(mut records) = result else {
            continue;
        };

        if let Some(count) = parsed.count {
            records.truncate(count);
        }

        if matches!(parsed.block_ms, Some(block_ms) if block_ms > 0) && records.is_empty() {
            return Ok(RespValue::Null);
        }

        if records.is_empty() {
            continue;
        }

        reply.push(stream_reply(name, &records));
    }

    Ok(RespValue::Array(reply))
}

fn stream_reply(name: &str, records: &[StreamRecord]) -> RespValue {
    RespValue::Array(vec![RespValue::bulk(name), records_to_resp(records)])
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;

    use crate::resp::RespValue;
    use crate::store::Store;

    use super::super::CommandError;
    use super::xread;

    fn args(parts: &[&str]) -> Vec<RespValue> {
        parts.iter().map(RespValue::bulk).collect()
    }

    async fn seeded_store() -> Store {
        let store = Store::new();
        for seq in 1..=3u64 {
            store
                .xadd(
                    "s",
                    &format!("1-{}", seq),
                    vec![("f".to_string(), Bytes::from_static(b"v"))],
                )
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_xread_from_zero_returns_everything() {
        let store = seeded_store().await;

        let reply = xread(&store, &args(&["STREAMS", "s", "0-0"])).await.unwrap();
        let RespValue::Array(streams) = reply else {
            panic!("expected an array reply");
        };
        assert_eq!(streams.len(), 1);

        let RespValue::Array(parts) = &streams[0] else {
            panic!("expected a per-stream array");
        };
        assert_eq!(parts[0], RespValue::bulk("s"));
        let RespValue::Array(entries) = &parts[1] else {
            panic!("expected the entries array");
        };
        assert_eq!(entries.len(), 3);
    }

    #[tokio::test]
    async fn test_xread_after_last_id_omits_the_stream() {
        let store = seeded_store().await;

        let reply = xread(&store, &args(&["STREAMS", "s", "1-3"])).await.unwrap();
        assert_eq!(reply, RespValue::Array(vec![]));
    }

    #[tokio::test]
    async fn test_xread_count_truncates() {
        let store = seeded_store().await;

        let reply = xread(&store, &args(&["COUNT", "2", "STREAMS", "s", "0-0"]))
            .await
            .unwrap();
        let RespValue::Array(streams) = reply else {
            panic!("expected an array reply");
        };
        let RespValue::Array(parts) = &streams[0] else {
            panic!("expected a per-stream array");
        };
        let RespValue::Array(entries) = &parts[1] else {
            panic!("expected the entries array");
        };
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn test_xread_block_timeout_replies_nil() {
        let store = seeded_store().await;

        let reply = xread(&store, &args(&["BLOCK", "40", "STREAMS", "s", "1-3"]))
            .await
            .unwrap();
        assert_eq!(reply, RespValue::Null);
    }

    #[tokio::test]
    async fn test_xread_block_zero_waits_for_data() {
        let store = Arc::new(seeded_store().await);

        let reader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                xread(&store, &args(&["BLOCK", "0", "STREAMS", "s", "1-3"])).await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        store
            .xadd(
                "s",
                "2-0",
                vec![("f".to_string(), Bytes::from_static(b"late"))],
            )
            .await
            .unwrap();

        let reply = tokio::time::timeout(Duration::from_secs(2), reader)
            .await
            .expect("blocked read should wake")
            .unwrap()
            .unwrap();

        let RespValue::Array(streams) = reply else {
            panic!("expected an array reply");
        };
        assert_eq!(streams.len(), 1);
    }

    #[tokio::test]
    async fn test_xread_requires_a_streams_block() {
        let store = seeded_store().await;

        assert_eq!(
            xread(&store, &args(&["BLOCK", "0", "s", "0-0"])).await,
            Err(CommandError::SyntaxError)
        );
        assert_eq!(
            xread(&store, &args(&["STREAMS", "s"])).await,
            Err(CommandError::WrongNumberOfArguments("XREAD"))
        );
        assert_eq!(
            xread(&store, &args(&["BLOCK", "-1", "STREAMS", "s", "0-0"])).await,
            Err(CommandError::InvalidBlockTime)
        );
    }
}
