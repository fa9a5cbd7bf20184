//! Administrative commands issued while bootstrapping a server.
//!
//! Every command follows the same shape: open a connection with the given
//! credential, run exactly one request through the [`Awaiter`], interpret the
//! reply and close the connection before returning, whatever the outcome.

use std::fmt;

use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::awaiter::{AwaitError, Awaiter, Interrupt};
use crate::client::{ClientError, Connection, Credential, DatabaseClient, Document, ServerAddress};

/// Database holding users with cluster-wide roles.
pub const ADMIN_DATABASE: &str = "admin";

/// Database the scoped credential authenticates against when access is
/// verified.
pub const VERIFY_DATABASE: &str = "test";

const COMMAND_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::command");

/// Built-in role granted to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// Unrestricted access to every database.
    Root,
    /// Read and write access to a single database.
    ReadWrite,
    /// Any other role, by name.
    Named(String),
}

impl Role {
    /// Role name as understood by the server.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Root => "root",
            Self::ReadWrite => "readWrite",
            Self::Named(name) => name.as_str(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Administrative command names, used to identify failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminCommand {
    /// `createUser`.
    CreateUser,
    /// Database identity lookup.
    VerifyAccess,
    /// `replSetInitiate`.
    ReplSetInitiate,
    /// `shutdown`.
    Shutdown,
}

impl fmt::Display for AdminCommand {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CreateUser => "createUser",
            Self::VerifyAccess => "verifyAccess",
            Self::ReplSetInitiate => "replSetInitiate",
            Self::Shutdown => "shutdown",
        };
        formatter.write_str(label)
    }
}

/// Errors surfaced by administrative commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The runtime backing the awaiter could not be created.
    #[error("failed to prepare command execution: {source}")]
    Runtime {
        /// Underlying awaiter error.
        #[source]
        source: AwaitError,
    },
    /// Opening the connection failed.
    #[error("{command}: failed to connect to {address}: {source}")]
    Connect {
        /// Command being issued.
        command: AdminCommand,
        /// Server address.
        address: ServerAddress,
        /// Underlying client error.
        #[source]
        source: ClientError,
    },
    /// The reply never arrived.
    #[error("{command} on '{database}' did not complete: {source}")]
    Reply {
        /// Command being issued.
        command: AdminCommand,
        /// Database the command ran against.
        database: String,
        /// Underlying awaiter error.
        #[source]
        source: AwaitError,
    },
    /// The server answered without a success indicator.
    #[error("{command} on '{database}' was rejected: {reply}")]
    Rejected {
        /// Command being issued.
        command: AdminCommand,
        /// Database the command ran against.
        database: String,
        /// Reply returned by the server.
        reply: Document,
    },
    /// The database handle was unavailable to the credential.
    #[error("database '{database}' is not accessible as {credential}")]
    Inaccessible {
        /// Database that was queried.
        database: String,
        /// Credential used for the lookup.
        credential: Credential,
    },
}

impl CommandError {
    /// Command that failed, when the failure is tied to one.
    #[must_use]
    pub const fn command(&self) -> Option<AdminCommand> {
        match self {
            Self::Runtime { .. } => None,
            Self::Connect { command, .. }
            | Self::Reply { command, .. }
            | Self::Rejected { command, .. } => Some(*command),
            Self::Inaccessible { .. } => Some(AdminCommand::VerifyAccess),
        }
    }
}

/// Returns `true` when `reply` carries the numeric `ok >= 1.0` success flag.
#[must_use]
pub fn reply_succeeded(reply: &Document) -> bool {
    reply
        .get("ok")
        .and_then(serde_json::Value::as_f64)
        .is_some_and(|ok| ok >= 1.0)
}

/// Administrative command set bound to one server.
pub struct AdminCommands<'a> {
    client: &'a dyn DatabaseClient,
    address: &'a ServerAddress,
    awaiter: Awaiter,
}

impl<'a> AdminCommands<'a> {
    /// Binds the command set to the server at `address`.
    pub fn new(
        client: &'a dyn DatabaseClient,
        address: &'a ServerAddress,
    ) -> Result<Self, CommandError> {
        Self::interruptible(client, address, Interrupt::new())
    }

    /// Binds the command set to the server at `address`, abandoning any
    /// pending reply once `interrupt` is raised.
    pub fn interruptible(
        client: &'a dyn DatabaseClient,
        address: &'a ServerAddress,
        interrupt: Interrupt,
    ) -> Result<Self, CommandError> {
        let awaiter = Awaiter::with_interrupt(interrupt)
            .map_err(|source| CommandError::Runtime { source })?;
        Ok(Self::with_awaiter(client, address, awaiter))
    }

    /// Binds the command set using an existing awaiter, e.g. one sharing an
    /// interrupt flag with the caller.
    #[must_use]
    pub const fn with_awaiter(
        client: &'a dyn DatabaseClient,
        address: &'a ServerAddress,
        awaiter: Awaiter,
    ) -> Self {
        Self {
            client,
            address,
            awaiter,
        }
    }

    /// Creates `username` in `database` with `roles`, connecting with
    /// `credential` (or unauthenticated when `None`).
    ///
    /// Returns whether the server reported success.
    pub fn create_user(
        &self,
        credential: Option<&Credential>,
        database: &str,
        username: &str,
        password: &str,
        roles: &[Role],
    ) -> Result<bool, CommandError> {
        let role_names: Vec<&str> = roles.iter().map(Role::as_str).collect();
        let request = json!({
            "createUser": username,
            "pwd": password,
            "roles": role_names,
        });
        let reply = self.run(AdminCommand::CreateUser, credential, database, request)?;
        Ok(reply_succeeded(&reply))
    }

    /// Confirms that `credential` can resolve the identity of `database`.
    pub fn verify_access(
        &self,
        database: &str,
        credential: &Credential,
    ) -> Result<(), CommandError> {
        let connection = self.connect(AdminCommand::VerifyAccess, Some(credential))?;
        let resolved = connection.database_name(database);
        drop(connection);
        debug!(
            target: COMMAND_TARGET,
            database,
            credential = %credential,
            resolved = resolved.is_some(),
            "database identity resolved"
        );
        match resolved {
            Some(_) => Ok(()),
            None => Err(CommandError::Inaccessible {
                database: database.to_owned(),
                credential: credential.clone(),
            }),
        }
    }

    /// Initiates a replica set with the server's default configuration.
    ///
    /// Runs unauthenticated against the admin database, so it must happen
    /// before access control locks the server down.
    pub fn initiate_replica_set(&self) -> Result<(), CommandError> {
        let request = json!({ "replSetInitiate": {} });
        let reply = self.run(AdminCommand::ReplSetInitiate, None, ADMIN_DATABASE, request)?;
        Self::require_success(AdminCommand::ReplSetInitiate, ADMIN_DATABASE, reply)
    }

    /// Asks the server to shut itself down.
    pub fn shutdown(&self, database: &str, credential: &Credential) -> Result<(), CommandError> {
        let request = json!({ "shutdown": 1 });
        let reply = self.run(AdminCommand::Shutdown, Some(credential), database, request)?;
        Self::require_success(AdminCommand::Shutdown, database, reply)
    }

    fn run(
        &self,
        command: AdminCommand,
        credential: Option<&Credential>,
        database: &str,
        request: Document,
    ) -> Result<Document, CommandError> {
        let connection = self.connect(command, credential)?;
        let reply = self.awaiter.get(connection.run_command(database, request));
        drop(connection);
        debug!(
            target: COMMAND_TARGET,
            %command,
            database,
            address = %self.address,
            succeeded = reply.is_ok(),
            "command completed"
        );
        reply.map_err(|source| CommandError::Reply {
            command,
            database: database.to_owned(),
            source,
        })
    }

    fn connect(
        &self,
        command: AdminCommand,
        credential: Option<&Credential>,
    ) -> Result<Box<dyn Connection>, CommandError> {
        self.client
            .connect(self.address, credential)
            .map_err(|source| CommandError::Connect {
                command,
                address: self.address.clone(),
                source,
            })
    }

    fn require_success(
        command: AdminCommand,
        database: &str,
        reply: Document,
    ) -> Result<(), CommandError> {
        if reply_succeeded(&reply) {
            Ok(())
        } else {
            Err(CommandError::Rejected {
                command,
                database: database.to_owned(),
                reply,
            })
        }
    }
}
