use crate::resp::RespValue;
use crate::store::Store;

use super::arguments::string_arg;
use super::CommandError;

/// KEYS lists the live keys matching a pattern. Only `*` is supported;
/// any other pattern matches nothing.
pub async fn keys(store: &Store, args: &[RespValue]) -> Result<RespValue, CommandError> {
    if args.len() != 1 {
        return Err(CommandError::WrongNumberOfArguments("KEYS"));
    }

    let pattern = string_arg(args, 0, "KEYS")?;

    let keys = store.keys(&pattern).await;
    let reply = keys.iter().map(RespValue::bulk).collect();

    Ok(RespValue::Array(reply))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use crate::resp::RespValue;
    use crate::store::Store;

    use super::keys;

    #[tokio::test]
    async fn test_keys_star_lists_everything() {
        let store = Store::new();
        store.set("a", Bytes::from_static(b"1"), None).await;
        store.set("b", Bytes::from_static(b"2"), None).await;

        let reply = keys(&store, &[RespValue::bulk("*")]).await.unwrap();
        let RespValue::Array(mut items) = reply else {
            panic!("expected an array reply");
        };
        items.sort_by_key(|item| format!("{:?}", item));
        assert_eq!(items, vec![RespValue::bulk("a"), RespValue::bulk("b")]);
    }

    #[tokio::test]
    async fn test_keys_other_patterns_match_nothing() {
        let store = Store::new();
        store.set("a", Bytes::from_static(b"1"), None).await;

        let reply = keys(&store, &[RespValue::bulk("a*")]).await.unwrap();
        assert_eq!(reply, RespValue::Array(vec![]));
    }
}
