//! Shared harness for the end-to-end tests: a server on an ephemeral port
//! plus a raw-socket client speaking literal RESP bytes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use redlite::commands::CommandExecutor;
use redlite::config::ServerConfig;
use redlite::connection::handle_client;
use redlite::store::Store;
use redlite::transactions::TxManager;

/// Binds a listener on an ephemeral port and serves connections exactly the
/// way the real accept loop does. Returns the address to connect to.
pub async fn spawn_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let store = Arc::new(Store::new());
    let transactions = Arc::new(TxManager::new());
    let config = Arc::new(ServerConfig::default());

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };

            let executor = CommandExecutor::new(
                Arc::clone(&store),
                Arc::clone(&transactions),
                Arc::clone(&config),
            );
            tokio::spawn(handle_client(stream, executor));
        }
    });

    addr
}

pub struct Client {
    stream: TcpStream,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Self {
        Self {
            stream: TcpStream::connect(addr).await.unwrap(),
        }
    }

    pub async fn send(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
        self.stream.flush().await.unwrap();
    }

    /// Reads exactly the expected reply bytes and asserts they match.
    pub async fn expect(&mut self, expected: &[u8]) {
        let mut buf = vec![0u8; expected.len()];
        tokio::time::timeout(Duration::from_secs(2), self.stream.read_exact(&mut buf))
            .await
            .expect("timed out waiting for reply")
            .unwrap();

        assert_eq!(
            buf,
            expected,
            "reply was {:?}, expected {:?}",
            String::from_utf8_lossy(&buf),
            String::from_utf8_lossy(expected)
        );
    }

    /// One read's worth of reply bytes, for variable-length replies. An
    /// empty result means the server closed the connection.
    pub async fn read_some(&mut self) -> Vec<u8> {
        let mut buf = vec![0u8; 4096];
        let n = tokio::time::timeout(Duration::from_secs(2), self.stream.read(&mut buf))
            .await
            .expect("timed out waiting for reply")
            .unwrap();
        buf.truncate(n);
        buf
    }
}

/// Encodes a command as the array-of-bulk-strings frame a client sends.
pub fn encode_command(parts: &[&str]) -> Vec<u8> {
    let mut out = format!("*{}\r\n", parts.len()).into_bytes();
    for part in parts {
        out.extend(format!("${}\r\n{}\r\n", part.len(), part).into_bytes());
    }
    out
}
