//! Replica set initiation after the server process is running.

use std::sync::Arc;

use tracing::info;

use embedmongo_config::Config;

use crate::awaiter::Interrupt;
use crate::client::DatabaseClient;
use crate::commands::{AdminCommands, CommandError};
use crate::observer::{Milestone, Observers};
use crate::server::ServerHandle;

const REPLICA_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::replica");

/// Initiates a single-member replica set on a running server.
#[derive(Clone)]
pub struct ReplicaSetInit {
    client: Arc<dyn DatabaseClient>,
    interrupt: Interrupt,
}

impl ReplicaSetInit {
    /// Builds the initiator over `client`.
    #[must_use]
    pub fn new(client: Arc<dyn DatabaseClient>) -> Self {
        Self {
            client,
            interrupt: Interrupt::new(),
        }
    }

    /// Abandons a pending initiation reply once `interrupt` is raised.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Runs `replSetInitiate` against `server`.
    pub fn initiate(&self, server: &ServerHandle) -> Result<(), CommandError> {
        let commands = AdminCommands::interruptible(
            self.client.as_ref(),
            server.address(),
            self.interrupt.clone(),
        )?;
        commands.initiate_replica_set()?;
        info!(
            target: REPLICA_TARGET,
            address = %server.address(),
            "replica set initiated"
        );
        Ok(())
    }

    /// Observers initiating the replica set once the process is running.
    ///
    /// The set is empty unless replication is configured and the server
    /// version supports initiation.
    #[must_use]
    pub fn observers(self, config: &Config) -> Observers {
        if !config.initiates_replica_set() {
            return Observers::empty();
        }
        Observers::builder()
            .on_reached(Milestone::ProcessRunning, "initiate-replica-set", move |server| {
                self.initiate(server)
            })
            .build()
    }
}
