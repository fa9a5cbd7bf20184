//! Access-control bootstrap run once the server process is running.
//!
//! The sequence is fixed and attempted once per start:
//!
//! 1. create the user with the `root` role in the admin database,
//!    connecting without credentials;
//! 2. create the same user with `readWrite` on the target database,
//!    authenticated as the root user;
//! 3. verify that a credential scoped to the verification database can resolve the
//!    target database.
//!
//! The first failing step aborts the sequence.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use embedmongo_config::AccessConfig;

use crate::awaiter::Interrupt;
use crate::client::{Credential, DatabaseClient};
use crate::commands::{ADMIN_DATABASE, AdminCommands, CommandError, Role, VERIFY_DATABASE};
use crate::observer::{Milestone, Observers};
use crate::server::ServerHandle;

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Steps of the access bootstrap, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootstrapStep {
    /// Create the root user in the admin database.
    CreateRootUser,
    /// Create the read/write user in the target database.
    CreateDatabaseUser,
    /// Verify access to the target database.
    VerifyAccess,
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CreateRootUser => "create root user",
            Self::CreateDatabaseUser => "create database user",
            Self::VerifyAccess => "verify access",
        };
        formatter.write_str(label)
    }
}

/// Steps completed by a successful bootstrap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapOutcome {
    completed: Vec<BootstrapStep>,
}

impl BootstrapOutcome {
    /// Completed steps, in execution order.
    #[must_use]
    pub fn completed(&self) -> &[BootstrapStep] {
        &self.completed
    }
}

/// Errors aborting the access bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The server did not report success when creating a user.
    #[error("could not create {username} user in {database}")]
    UserNotCreated {
        /// Step that failed.
        step: BootstrapStep,
        /// User being created.
        username: String,
        /// Database the user was created in.
        database: String,
    },
    /// A command failed outright.
    #[error("{step} failed for {username} in {database}: {source}")]
    Command {
        /// Step that failed.
        step: BootstrapStep,
        /// User being provisioned.
        username: String,
        /// Database targeted by the step.
        database: String,
        /// Underlying command error.
        #[source]
        source: CommandError,
    },
    /// The command set could not be prepared, so no step ran.
    #[error("failed to prepare bootstrap commands: {source}")]
    Runtime {
        /// Underlying command error.
        #[source]
        source: CommandError,
    },
}

impl BootstrapError {
    /// Step that aborted the sequence, or `None` when no step ran.
    #[must_use]
    pub const fn step(&self) -> Option<BootstrapStep> {
        match self {
            Self::UserNotCreated { step, .. } | Self::Command { step, .. } => Some(*step),
            Self::Runtime { .. } => None,
        }
    }
}

/// Provisions a user with root and read/write access on a running server.
#[derive(Clone)]
pub struct UserAccess {
    client: Arc<dyn DatabaseClient>,
    database: String,
    username: String,
    password: String,
    interrupt: Interrupt,
}

impl fmt::Debug for UserAccess {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("UserAccess")
            .field("database", &self.database)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl UserAccess {
    /// Builds the bootstrap for `database` using the configured user.
    #[must_use]
    pub fn new(
        client: Arc<dyn DatabaseClient>,
        database: impl Into<String>,
        access: &AccessConfig,
    ) -> Self {
        Self {
            client,
            database: database.into(),
            username: access.username.clone(),
            password: access.password.clone(),
            interrupt: Interrupt::new(),
        }
    }

    /// Abandons pending command replies once `interrupt` is raised.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Credential of the root user created by the first step.
    #[must_use]
    pub fn root_credential(&self) -> Credential {
        Credential::new(&self.username, &self.password, ADMIN_DATABASE)
    }

    /// Credential used to verify access in the last step.
    #[must_use]
    pub fn verify_credential(&self) -> Credential {
        Credential::new(&self.username, &self.password, VERIFY_DATABASE)
    }

    /// Runs the bootstrap sequence against `server`.
    pub fn enable(&self, server: &ServerHandle) -> Result<BootstrapOutcome, BootstrapError> {
        info!(
            target: BOOTSTRAP_TARGET,
            username = %self.username,
            database = %self.database,
            address = %server.address(),
            "enabling user access"
        );
        let commands = self
            .commands(server)
            .map_err(|source| BootstrapError::Runtime { source })?;
        let mut outcome = BootstrapOutcome::default();

        self.create_user(
            &commands,
            BootstrapStep::CreateRootUser,
            None,
            ADMIN_DATABASE,
            Role::Root,
        )?;
        outcome.completed.push(BootstrapStep::CreateRootUser);

        let root = self.root_credential();
        self.create_user(
            &commands,
            BootstrapStep::CreateDatabaseUser,
            Some(&root),
            &self.database,
            Role::ReadWrite,
        )?;
        outcome.completed.push(BootstrapStep::CreateDatabaseUser);

        commands
            .verify_access(&self.database, &self.verify_credential())
            .map_err(|source| {
                self.command_error(BootstrapStep::VerifyAccess, &self.database, source)
            })?;
        outcome.completed.push(BootstrapStep::VerifyAccess);

        info!(
            target: BOOTSTRAP_TARGET,
            username = %self.username,
            database = %self.database,
            "user access enabled"
        );
        Ok(outcome)
    }

    /// Sends an authenticated shutdown request to `server`.
    pub fn send_shutdown(&self, server: &ServerHandle) -> Result<(), CommandError> {
        info!(
            target: BOOTSTRAP_TARGET,
            username = %self.username,
            address = %server.address(),
            "sending authenticated shutdown"
        );
        let commands = self.commands(server)?;
        let result = commands.shutdown(ADMIN_DATABASE, &self.root_credential());
        if let Err(error) = &result {
            warn!(
                target: BOOTSTRAP_TARGET,
                error = %error,
                "authenticated shutdown failed"
            );
        }
        result
    }

    /// Observers running the bootstrap when the process is running and the
    /// authenticated shutdown before it is torn down.
    #[must_use]
    pub fn observers(self) -> Observers {
        let shutdown = self.clone();
        Observers::builder()
            .on_reached(Milestone::ProcessRunning, "enable-user-access", move |server| {
                self.enable(server).map(drop)
            })
            .on_tear_down(Milestone::ProcessRunning, "send-shutdown", move |server| {
                shutdown.send_shutdown(server)
            })
            .build()
    }

    fn commands<'a>(
        &'a self,
        server: &'a ServerHandle,
    ) -> Result<AdminCommands<'a>, CommandError> {
        AdminCommands::interruptible(
            self.client.as_ref(),
            server.address(),
            self.interrupt.clone(),
        )
    }

    fn create_user(
        &self,
        commands: &AdminCommands<'_>,
        step: BootstrapStep,
        credential: Option<&Credential>,
        database: &str,
        role: Role,
    ) -> Result<(), BootstrapError> {
        let created = commands
            .create_user(credential, database, &self.username, &self.password, &[role])
            .map_err(|source| self.command_error(step, database, source))?;
        if created {
            Ok(())
        } else {
            Err(BootstrapError::UserNotCreated {
                step,
                username: self.username.clone(),
                database: database.to_owned(),
            })
        }
    }

    fn command_error(
        &self,
        step: BootstrapStep,
        database: &str,
        source: CommandError,
    ) -> BootstrapError {
        BootstrapError::Command {
            step,
            username: self.username.clone(),
            database: database.to_owned(),
            source,
        }
    }
}
