use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::commands::{CommandExecutor, CommandOutcome};
use crate::resp::{RespReader, RespValue, RespWriter};

/// Serves one client connection until it exits or disconnects.
///
/// Each connection owns its decoder, encoder, and a random client id that
/// keys the per-client transaction state. Frames must be non-empty arrays
/// whose first element names the verb; command errors are written back as
/// Error frames and the connection stays open, while undecodable input
/// closes it.
pub async fn handle_client(stream: TcpStream, executor: CommandExecutor) {
    let client_id = generate_client_id();
    let (read_half, write_half) = stream.into_split();
    let mut reader = RespReader::new(read_half);
    let mut writer = RespWriter::new(write_half);

    loop {
        let frame = match reader.decode().await {
            Ok(frame) => frame,
            Err(error) if error.is_disconnect() => {
                debug!(client = %client_id, "client disconnected");
                break;
            }
            Err(error) => {
                warn!(client = %client_id, %error, "failed to decode request");
                let _ = writer.encode(&RespValue::error("ERR bad request")).await;
                break;
            }
        };

        let Some((name, args)) = split_command(&frame) else {
            let reply = RespValue::error("ERR invalid command format");
            if writer.encode(&reply).await.is_err() {
                break;
            }
            continue;
        };

        let reply = match executor.execute(&client_id, &name, args).await {
            Ok(CommandOutcome::Reply(reply)) => reply,
            Ok(CommandOutcome::Close) => {
                debug!(client = %client_id, "client exited");
                break;
            }
            Err(error) => error.to_resp(),
        };

        if let Err(error) = writer.encode(&reply).await {
            warn!(client = %client_id, %error, "failed to write reply");
            break;
        }
    }

    executor.forget_client(&client_id).await;
}

/// A command frame is an array whose first element is the verb as a bulk
/// string; the remaining elements are its arguments.
fn split_command(frame: &RespValue) -> Option<(String, &[RespValue])> {
    let RespValue::Array(elements) = frame else {
        return None;
    };

    let (first, args) = elements.split_first()?;

    let RespValue::Bulk(verb) = first else {
        return None;
    };

    Some((String::from_utf8_lossy(verb).into_owned(), args))
}

fn generate_client_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}
