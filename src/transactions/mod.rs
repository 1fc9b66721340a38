//! Optimistic transactions: per-client MULTI queues guarded by
//! compare-and-swap over monotonic per-key version counters.
//!
//! WATCH records the current global version of each named key for the
//! client. Every committed write to a watched key bumps that key's global
//! version; at EXEC the recorded snapshots are compared against the current
//! versions and any advance aborts the whole queue.

mod versions;
mod watches;

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::RwLock;

use crate::resp::RespValue;

use self::versions::KeyVersions;
use self::watches::ClientWatches;

#[derive(Error, Debug, PartialEq)]
pub enum TxError {
    #[error("ERR MULTI calls can not be nested")]
    NestedMulti,
    #[error("ERR EXEC without MULTI")]
    ExecWithoutMulti,
    #[error("ERR DISCARD without MULTI")]
    DiscardWithoutMulti,
    #[error("ERR QUEUED without MULTI")]
    QueueWithoutMulti,
    #[error("inconsistency detected: global version for key '{0}' not found")]
    MissingGlobalVersion(String),
}

/// A command captured while a transaction is open, replayed at EXEC.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedCommand {
    pub name: String,
    pub args: Vec<RespValue>,
}

#[derive(Debug, Default)]
struct Tx {
    queued: Vec<QueuedCommand>,
}

/// What EXEC decided: the CAS either failed, or the queue is handed back to
/// the executor to run in order.
#[derive(Debug, PartialEq)]
pub enum ExecOutcome {
    /// A watched key changed; the queue was dropped without running.
    Aborted,
    Commands(Vec<QueuedCommand>),
}

/// Owns all transaction state: open transactions per client, watch
/// snapshots, and the global key-version map.
///
/// A client with an entry in `transactions` is in the started state; absence
/// is the idle state.
#[derive(Debug, Default)]
pub struct TxManager {
    transactions: RwLock<HashMap<String, Tx>>,
    watches: ClientWatches,
    versions: KeyVersions,
}

impl TxManager {
    pub fn new() -> Self {
        Self {
            transactions: RwLock::new(HashMap::new()),
            watches: ClientWatches::new(),
            versions: KeyVersions::new(),
        }
    }

    pub async fn multi(&self, client_id: &str) -> Result<(), TxError> {
        let mut transactions = self.transactions.write().await;

        if transactions.contains_key(client_id) {
            return Err(TxError::NestedMulti);
        }

        transactions.insert(client_id.to_string(), Tx::default());
        Ok(())
    }

    /// Appends a command to the client's open transaction. Errors when no
    /// transaction is open, which the executor uses as the signal to run the
    /// command immediately instead.
    pub async fn queue(&self, client_id: &str, command: QueuedCommand) -> Result<(), TxError> {
        let mut transactions = self.transactions.write().await;

        let tx = transactions
            .get_mut(client_id)
            .ok_or(TxError::QueueWithoutMulti)?;

        tx.queued.push(command);
        Ok(())
    }

    pub async fn discard(&self, client_id: &str) -> Result<(), TxError> {
        let mut transactions = self.transactions.write().await;

        transactions
            .remove(client_id)
            .ok_or(TxError::DiscardWithoutMulti)?;

        self.watches.unwatch(client_id).await;
        Ok(())
    }

    /// Starts watching `key` for the client, assigning the key its first
    /// global version if it has none yet.
    pub async fn watch(&self, client_id: &str, key: &str) {
        let version = match self.versions.get(key).await {
            Some(version) => version,
            None => self.versions.upsert(key).await,
        };

        self.watches.watch(client_id, key, version).await;
    }

    pub async fn unwatch(&self, client_id: &str) {
        self.watches.unwatch(client_id).await;
    }

    /// Closes the transaction and runs the CAS check. Watches and the queue
    /// are consumed on every outcome, including the abort path.
    pub async fn exec(&self, client_id: &str) -> Result<ExecOutcome, TxError> {
        let mut transactions = self.transactions.write().await;

        let tx = transactions
            .remove(client_id)
            .ok_or(TxError::ExecWithoutMulti)?;

        let check = self.watches.check(client_id, &self.versions).await;
        self.watches.unwatch(client_id).await;

        match check? {
            false => Ok(ExecOutcome::Aborted),
            true => Ok(ExecOutcome::Commands(tx.queued)),
        }
    }

    /// Called by mutating handlers after a successful write so that watchers
    /// of `key` observe the change at EXEC time.
    pub async fn publish_write(&self, key: &str) {
        self.versions.bump_if_tracked(key).await;
    }

    pub async fn in_transaction(&self, client_id: &str) -> bool {
        self.transactions.read().await.contains_key(client_id)
    }

    /// Drops all per-client state on disconnect.
    pub async fn remove_client(&self, client_id: &str) {
        self.transactions.write().await.remove(client_id);
        self.watches.unwatch(client_id).await;
    }
}
