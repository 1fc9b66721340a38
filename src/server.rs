use std::io;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::commands::CommandExecutor;
use crate::config::ServerConfig;
use crate::connection::handle_client;
use crate::rdb::RdbParser;
use crate::store::Store;
use crate::transactions::TxManager;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9379;

/// The server context: the engine, the transaction manager, and the
/// configuration, owned in one place and shared with connection tasks.
pub struct RedisServer {
    host: String,
    port: u16,
    store: Arc<Store>,
    transactions: Arc<TxManager>,
    config: Arc<ServerConfig>,
}

impl RedisServer {
    pub fn new(host: &str, port: u16, config: ServerConfig) -> Self {
        Self {
            host: host.to_string(),
            port,
            store: Arc::new(Store::new()),
            transactions: Arc::new(TxManager::new()),
            config: Arc::new(config),
        }
    }

    /// Loads the snapshot when one exists, binds the listener, and serves
    /// connections forever. Only a bind failure is returned to the caller;
    /// accept errors are logged and the loop continues.
    pub async fn start(&self) -> io::Result<()> {
        self.load_snapshot().await;

        let listener = TcpListener::bind(format!("{}:{}", self.host, self.port)).await?;
        info!(host = %self.host, port = self.port, "listening");

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(%peer, "accepted connection");
                    let executor = CommandExecutor::new(
                        Arc::clone(&self.store),
                        Arc::clone(&self.transactions),
                        Arc::clone(&self.config),
                    );

                    tokio::spawn(handle_client(stream, executor));
                }
                Err(error) => {
                    error!(%error, "failed to accept connection");
                }
            }
        }
    }

    /// Rehydrates the key/value store from the configured snapshot file.
    /// A missing file is normal; a corrupt one is logged and the server
    /// continues with an empty store.
    async fn load_snapshot(&self) {
        let path = self.config.snapshot_path();

        if !path.exists() {
            debug!(path = %path.display(), "no snapshot file");
            return;
        }

        info!(path = %path.display(), "loading snapshot");

        let mut parser = RdbParser::new();
        match parser.parse(&path) {
            Ok(entries) => {
                let count = entries.len();
                for entry in entries {
                    self.store.set(&entry.key, entry.value, entry.ttl).await;
                }
                info!(keys = count, "snapshot loaded");
            }
            Err(error) => {
                error!(%error, "snapshot load failed, continuing with an empty store");
            }
        }
    }
}
