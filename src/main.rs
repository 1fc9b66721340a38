use std::path::PathBuf;

use clap::Parser;
use tracing::error;

use redlite::config::ServerConfig;
use redlite::server::{RedisServer, DEFAULT_HOST, DEFAULT_PORT};

#[derive(Parser, Debug)]
#[command(name = "redlite", about = "A Redis-protocol-compatible in-memory data server")]
struct Args {
    /// Directory holding the snapshot file
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Snapshot file name
    #[arg(long, default_value = "dump.rdb")]
    dbfilename: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = ServerConfig::new(args.dir, args.dbfilename);

    let server = RedisServer::new(DEFAULT_HOST, DEFAULT_PORT, config);
    if let Err(e) = server.start().await {
        error!(error = %e, "failed to start server");
        std::process::exit(1);
    }
}
