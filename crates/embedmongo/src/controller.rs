//! Start/stop controller owning the single running server.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::graph::{GraphError, RunningServer, TransitionGraph};
use crate::observer::{Milestone, Observers};
use crate::reporter::{LIFECYCLE_TARGET, LifecycleReporter};
use crate::server::ServerHandle;

/// Lifecycle state of a [`ServerController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStatus {
    /// Nothing started yet, or the last start attempt failed.
    Idle,
    /// A server is running and owned by the controller.
    Running,
    /// The server was stopped; the controller cannot be started again.
    Stopped,
}

impl fmt::Display for ControllerStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopped => "stopped",
        };
        formatter.write_str(label)
    }
}

/// Errors surfaced by [`ServerController`].
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// `start()` was called while a server is already running.
    #[error("server is already running")]
    AlreadyRunning,
    /// `start()` was called after the controller was stopped.
    #[error("controller was stopped and cannot be restarted")]
    NotRestartable,
    /// `stop()` was called without a running server.
    #[error("stop() called without a running server; start() must succeed first")]
    NotRunning,
    /// The milestone could not be reached.
    #[error("failed to reach {milestone}: {source}")]
    Start {
        /// Milestone being resolved.
        milestone: Milestone,
        /// Underlying graph error.
        #[source]
        source: GraphError,
    },
    /// The running server could not be released.
    #[error("failed to stop server: {source}")]
    Stop {
        /// Underlying graph error.
        #[source]
        source: GraphError,
    },
}

impl LifecycleError {
    /// Returns `true` for errors caused by calling the controller out of
    /// order.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRunning | Self::NotRestartable | Self::NotRunning
        )
    }
}

/// Drives a [`TransitionGraph`] through start and stop.
///
/// The controller owns at most one running server. Observers fire during
/// [`ServerController::start`], in registration order, before it returns.
/// Callers serialise access; the controller has no internal locking.
pub struct ServerController<G> {
    graph: G,
    observers: Observers,
    reporter: Arc<dyn LifecycleReporter>,
    status: ControllerStatus,
    running: Option<Box<dyn RunningServer>>,
}

impl<G> fmt::Debug for ServerController<G> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ServerController")
            .field("observers", &self.observers)
            .field("status", &self.status)
            .field("server", &self.server())
            .finish_non_exhaustive()
    }
}

impl<G: TransitionGraph> ServerController<G> {
    /// Builds an idle controller.
    #[must_use]
    pub fn new(graph: G, observers: Observers, reporter: Arc<dyn LifecycleReporter>) -> Self {
        Self {
            graph,
            observers,
            reporter,
            status: ControllerStatus::Idle,
            running: None,
        }
    }

    /// Brings the server to [`Milestone::ProcessRunning`].
    ///
    /// Every registered observer has completed when this returns. A failed
    /// attempt stores nothing and leaves the controller idle, so the call
    /// may be retried.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyRunning`] or
    /// [`LifecycleError::NotRestartable`] when called out of order, and
    /// [`LifecycleError::Start`] when the graph or an observer fails.
    pub fn start(&mut self) -> Result<&ServerHandle, LifecycleError> {
        match self.status {
            ControllerStatus::Idle => {}
            ControllerStatus::Running => return Err(LifecycleError::AlreadyRunning),
            ControllerStatus::Stopped => return Err(LifecycleError::NotRestartable),
        }

        let milestone = Milestone::ProcessRunning;
        self.reporter.start_requested(milestone);
        match self.graph.resolve(milestone, &self.observers) {
            Ok(running) => {
                self.reporter.server_running(running.server());
                self.status = ControllerStatus::Running;
                Ok(self.running.insert(running).server())
            }
            Err(source) => {
                let error = LifecycleError::Start { milestone, source };
                self.reporter.start_failed(&error);
                Err(error)
            }
        }
    }

    /// Releases the running server.
    ///
    /// The controller is stopped afterwards, even when releasing fails.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotRunning`] when no server is running; no
    /// resource is touched in that case. Returns [`LifecycleError::Stop`]
    /// when the server could not be released.
    pub fn stop(&mut self) -> Result<(), LifecycleError> {
        let Some(running) = self.running.take() else {
            let error = LifecycleError::NotRunning;
            self.reporter.stop_failed(&error);
            return Err(error);
        };
        self.status = ControllerStatus::Stopped;

        let server = running.server();
        self.reporter.stop_requested(server);
        let address = server.address().clone();
        match running.release() {
            Ok(()) => {
                self.reporter.server_stopped(&address);
                Ok(())
            }
            Err(source) => {
                let error = LifecycleError::Stop { source };
                self.reporter.stop_failed(&error);
                Err(error)
            }
        }
    }
}

impl<G> ServerController<G> {
    /// Current lifecycle state.
    #[must_use]
    pub const fn status(&self) -> ControllerStatus {
        self.status
    }

    /// Returns `true` while a server is running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.status, ControllerStatus::Running)
    }

    /// The running server, if any.
    #[must_use]
    pub fn server(&self) -> Option<&ServerHandle> {
        self.running.as_deref().map(RunningServer::server)
    }

    /// Observers fired on start.
    #[must_use]
    pub const fn observers(&self) -> &Observers {
        &self.observers
    }
}

impl<G> Drop for ServerController<G> {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            let address = running.server().address().clone();
            if let Err(error) = running.release() {
                tracing::warn!(
                    target: LIFECYCLE_TARGET,
                    address = %address,
                    error = %error,
                    "failed to release server while dropping controller"
                );
            }
        }
    }
}
