use std::path::{Path, PathBuf};

/// Server configuration: where the snapshot file lives.
///
/// Owned by the server and passed down to the handlers that report it, so
/// tests can build their own configurations.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub dir: PathBuf,
    pub dbfilename: String,
}

impl ServerConfig {
    pub fn new(dir: PathBuf, dbfilename: String) -> Self {
        Self { dir, dbfilename }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.dbfilename)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            dbfilename: "dump.rdb".to_string(),
        }
    }
}
