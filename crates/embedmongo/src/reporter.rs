//! Structured reporting of server lifecycle events.

use std::sync::Arc;

use crate::client::ServerAddress;
use crate::controller::LifecycleError;
use crate::observer::Milestone;
use crate::server::ServerHandle;

pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait LifecycleReporter: Send + Sync {
    /// Invoked before the controller resolves `milestone`.
    fn start_requested(&self, milestone: Milestone);

    /// Invoked once the server is running and every observer succeeded.
    fn server_running(&self, server: &ServerHandle);

    /// Invoked when starting the server fails.
    fn start_failed(&self, error: &LifecycleError);

    /// Invoked before the running server is released.
    fn stop_requested(&self, server: &ServerHandle);

    /// Invoked after the server has been released.
    fn server_stopped(&self, address: &ServerAddress);

    /// Invoked when stopping the server fails.
    fn stop_failed(&self, error: &LifecycleError);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter,
{
    fn start_requested(&self, milestone: Milestone) {
        (**self).start_requested(milestone);
    }

    fn server_running(&self, server: &ServerHandle) {
        (**self).server_running(server);
    }

    fn start_failed(&self, error: &LifecycleError) {
        (**self).start_failed(error);
    }

    fn stop_requested(&self, server: &ServerHandle) {
        (**self).stop_requested(server);
    }

    fn server_stopped(&self, address: &ServerAddress) {
        (**self).server_stopped(address);
    }

    fn stop_failed(&self, error: &LifecycleError) {
        (**self).stop_failed(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn start_requested(&self, milestone: Milestone) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "start_requested",
            milestone = %milestone,
            "starting embedded server"
        );
    }

    fn server_running(&self, server: &ServerHandle) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "server_running",
            address = %server.address(),
            pid = ?server.pid(),
            "embedded server running"
        );
    }

    fn start_failed(&self, error: &LifecycleError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "start_failed",
            error = %error,
            "embedded server failed to start"
        );
    }

    fn stop_requested(&self, server: &ServerHandle) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "stop_requested",
            address = %server.address(),
            "stopping embedded server"
        );
    }

    fn server_stopped(&self, address: &ServerAddress) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "server_stopped",
            address = %address,
            "embedded server stopped"
        );
    }

    fn stop_failed(&self, error: &LifecycleError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "stop_failed",
            error = %error,
            "embedded server failed to stop"
        );
    }
}
