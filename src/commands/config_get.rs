use crate::config::ServerConfig;
use crate::resp::RespValue;

use super::arguments::string_arg;
use super::CommandError;

/// CONFIG GET returns `[name, value]` for the two snapshot parameters and
/// an empty array for anything else.
pub fn config(config: &ServerConfig, args: &[RespValue]) -> Result<RespValue, CommandError> {
    if args.len() < 2 {
        return Err(CommandError::WrongNumberOfArguments("CONFIG"));
    }

    let subcommand = string_arg(args, 0, "CONFIG")?.to_uppercase();
    if subcommand != "GET" {
        return Err(CommandError::UnknownCommand);
    }

    let parameter = string_arg(args, 1, "CONFIG")?.to_lowercase();

    let reply = match parameter.as_str() {
        "dir" => vec![
            RespValue::bulk("dir"),
            RespValue::bulk(config.dir.to_string_lossy().as_bytes()),
        ],
        "dbfilename" => vec![
            RespValue::bulk("dbfilename"),
            RespValue::bulk(&config.dbfilename),
        ],
        _ => Vec::new(),
    };

    Ok(RespValue::Array(reply))
}
