use crate::resp::RespValue;

use super::CommandError;

/// PING answers PONG regardless of arguments.
pub fn ping(_args: &[RespValue]) -> Result<RespValue, CommandError> {
    Ok(RespValue::simple("PONG"))
}

#[cfg(test)]
mod tests {
    use crate::resp::RespValue;

    use super::ping;

    #[test]
    fn test_ping() {
        assert_eq!(ping(&[]), Ok(RespValue::simple("PONG")));
        assert_eq!(
            ping(&[RespValue::bulk("hello")]),
            Ok(RespValue::simple("PONG"))
        );
    }
}
