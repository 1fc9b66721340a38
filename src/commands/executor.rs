use std::sync::Arc;

use crate::config::ServerConfig;
use crate::resp::RespValue;
use crate::store::Store;
use crate::transactions::{ExecOutcome, QueuedCommand, TxManager};

use super::{
    config_get, echo, get, incr, keys, ping, set, transactions, type_command, xadd, xrange,
    xread, CommandError,
};

/// What the connection loop should do with a handled command.
#[derive(Debug, PartialEq)]
pub enum CommandOutcome {
    Reply(RespValue),
    /// EXIT: close the connection without replying.
    Close,
}

const KNOWN_VERBS: &[&str] = &[
    "PING", "ECHO", "SET", "GET", "CONFIG", "KEYS", "TYPE", "XADD", "XRANGE", "XREAD", "INCR",
    "EXIT", "MULTI", "EXEC", "DISCARD", "WATCH", "UNWATCH",
];

/// Transaction control verbs run immediately even while a transaction is
/// open; everything else is queued.
fn is_transaction_control(name: &str) -> bool {
    matches!(name, "MULTI" | "EXEC" | "DISCARD" | "WATCH" | "UNWATCH")
}

/// Routes one parsed command to its handler.
///
/// The executor owns shared references to the engine so each connection
/// task can carry its own executor with just a client id's worth of state.
pub struct CommandExecutor {
    store: Arc<Store>,
    transactions: Arc<TxManager>,
    config: Arc<ServerConfig>,
}

impl CommandExecutor {
    pub fn new(store: Arc<Store>, transactions: Arc<TxManager>, config: Arc<ServerConfig>) -> Self {
        Self {
            store,
            transactions,
            config,
        }
    }

    /// Top-level dispatch: verbs are case-insensitive, EXIT closes, and
    /// while a transaction is open every non-control verb is queued and
    /// answered with `+QUEUED`.
    pub async fn execute(
        &self,
        client_id: &str,
        name: &str,
        args: &[RespValue],
    ) -> Result<CommandOutcome, CommandError> {
        let name = name.to_uppercase();

        if !KNOWN_VERBS.contains(&name.as_str()) {
            return Err(CommandError::UnknownCommand);
        }

        if name == "EXIT" {
            return Ok(CommandOutcome::Close);
        }

        if !is_transaction_control(&name) && self.transactions.in_transaction(client_id).await {
            let command = QueuedCommand {
                name: name.clone(),
                args: args.to_vec(),
            };

            if self.transactions.queue(client_id, command).await.is_ok() {
                return Ok(CommandOutcome::Reply(RespValue::simple("QUEUED")));
            }
            // The transaction vanished between the check and the queue
            // attempt; fall through and run the command directly.
        }

        let reply = match name.as_str() {
            "MULTI" => transactions::multi(&self.transactions, client_id, args).await?,
            "EXEC" => return self.exec(client_id, args).await,
            "DISCARD" => transactions::discard(&self.transactions, client_id, args).await?,
            "WATCH" => transactions::watch(&self.transactions, client_id, args).await?,
            "UNWATCH" => transactions::unwatch(&self.transactions, client_id, args).await?,
            _ => self.run(&name, args).await?,
        };

        Ok(CommandOutcome::Reply(reply))
    }

    /// Data-plane dispatch. Transaction control verbs never land here, so
    /// the EXEC replay below cannot recurse.
    async fn run(&self, name: &str, args: &[RespValue]) -> Result<RespValue, CommandError> {
        match name {
            "PING" => ping::ping(args),
            "ECHO" => echo::echo(args),
            "SET" => set::set(&self.store, &self.transactions, args).await,
            "GET" => get::get(&self.store, args).await,
            "CONFIG" => config_get::config(&self.config, args),
            "KEYS" => keys::keys(&self.store, args).await,
            "TYPE" => type_command::type_of(&self.store, args).await,
            "XADD" => xadd::xadd(&self.store, &self.transactions, args).await,
            "XRANGE" => xrange::xrange(&self.store, args).await,
            "XREAD" => xread::xread(&self.store, args).await,
            "INCR" => incr::incr(&self.store, &self.transactions, args).await,
            _ => Err(CommandError::UnknownCommand),
        }
    }

    /// EXEC: run the CAS check, then replay the queue in order. A failing
    /// command contributes an Error frame to the reply array; the rest of
    /// the queue still runs.
    async fn exec(
        &self,
        client_id: &str,
        args: &[RespValue],
    ) -> Result<CommandOutcome, CommandError> {
        if !args.is_empty() {
            return Err(CommandError::WrongNumberOfArguments("EXEC"));
        }

        match self.transactions.exec(client_id).await? {
            ExecOutcome::Aborted => Ok(CommandOutcome::Reply(RespValue::Null)),
            ExecOutcome::Commands(commands) => {
                let mut replies = Vec::with_capacity(commands.len());

                for command in commands {
                    match self.run(&command.name, &command.args).await {
                        Ok(reply) => replies.push(reply),
                        Err(error) => replies.push(error.to_resp()),
                    }
                }

                Ok(CommandOutcome::Reply(RespValue::Array(replies)))
            }
        }
    }

    /// Disconnect cleanup: open transactions and watches die with the
    /// connection that owns them.
    pub async fn forget_client(&self, client_id: &str) {
        self.transactions.remove_client(client_id).await;
    }
}
