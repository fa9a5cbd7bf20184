//! Contract of the transition graph that brings a server to a milestone, and
//! a process-backed implementation of it.

use thiserror::Error;
use tracing::warn;

use crate::observer::{Milestone, ObserverError, Observers};
use crate::process::{LaunchError, Launcher, PROCESS_TARGET, ServerProcess};
use crate::server::ServerHandle;

/// Errors surfaced while resolving or releasing a milestone.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The server could not be launched.
    #[error("failed to launch server: {source}")]
    Launch {
        /// Underlying launch error.
        #[source]
        source: LaunchError,
    },
    /// An observer failed after the milestone was reached.
    #[error("{milestone} observer failed: {source}")]
    Observer {
        /// Milestone whose observer failed.
        milestone: Milestone,
        /// Underlying observer error.
        #[source]
        source: ObserverError,
    },
    /// The server could not be stopped.
    #[error("failed to stop server: {source}")]
    Stop {
        /// Underlying launch error.
        #[source]
        source: LaunchError,
    },
}

/// Resolves a milestone, running the observers registered for it.
pub trait TransitionGraph {
    /// Brings a server to `milestone` and runs the matching reached-observers
    /// in order before returning.
    ///
    /// When an observer fails, anything started on the way is released
    /// before the error is returned.
    fn resolve(
        &self,
        milestone: Milestone,
        observers: &Observers,
    ) -> Result<Box<dyn RunningServer>, GraphError>;
}

/// A server held at a milestone.
pub trait RunningServer: Send {
    /// The running server.
    fn server(&self) -> &ServerHandle;

    /// Runs the tear-down observers and releases the server.
    fn release(self: Box<Self>) -> Result<(), GraphError>;
}

/// Transition graph reaching [`Milestone::ProcessRunning`] by launching a
/// server process.
#[derive(Debug, Clone)]
pub struct LaunchGraph<L> {
    launcher: L,
}

impl<L> LaunchGraph<L> {
    /// Builds the graph over `launcher`.
    #[must_use]
    pub const fn new(launcher: L) -> Self {
        Self { launcher }
    }
}

impl<L: Launcher> TransitionGraph for LaunchGraph<L> {
    fn resolve(
        &self,
        milestone: Milestone,
        observers: &Observers,
    ) -> Result<Box<dyn RunningServer>, GraphError> {
        let process = self
            .launcher
            .launch()
            .map_err(|source| GraphError::Launch { source })?;
        let server = ServerHandle::new(process.address().clone(), process.pid());
        if let Err(source) = observers.fire_reached(milestone, &server) {
            if let Err(error) = process.stop() {
                warn!(
                    target: PROCESS_TARGET,
                    address = %server.address(),
                    error = %error,
                    "failed to stop server after observer failure"
                );
            }
            return Err(GraphError::Observer { milestone, source });
        }
        Ok(Box::new(LaunchedServer {
            process,
            server,
            milestone,
            observers: observers.clone(),
        }))
    }
}

struct LaunchedServer {
    process: Box<dyn ServerProcess>,
    server: ServerHandle,
    milestone: Milestone,
    observers: Observers,
}

impl RunningServer for LaunchedServer {
    fn server(&self) -> &ServerHandle {
        &self.server
    }

    fn release(self: Box<Self>) -> Result<(), GraphError> {
        let Self {
            process,
            server,
            milestone,
            observers,
        } = *self;
        if let Err(error) = observers.fire_tear_down(milestone, &server) {
            warn!(
                target: PROCESS_TARGET,
                address = %server.address(),
                error = %error,
                "tear-down observer failed; stopping server anyway"
            );
        }
        process.stop().map_err(|source| GraphError::Stop { source })
    }
}
