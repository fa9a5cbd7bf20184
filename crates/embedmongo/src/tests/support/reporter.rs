//! Test double for [`LifecycleReporter`] that records structured events for
//! assertions.

use std::sync::Mutex;

use crate::client::ServerAddress;
use crate::controller::LifecycleError;
use crate::observer::Milestone;
use crate::reporter::LifecycleReporter;
use crate::server::ServerHandle;

/// Lifecycle events tracked during tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Start requested for a milestone.
    StartRequested(Milestone),
    /// Server running at an address.
    ServerRunning(ServerAddress),
    /// Start failed with an error description.
    StartFailed(String),
    /// Stop requested for the server at an address.
    StopRequested(ServerAddress),
    /// Server at an address stopped.
    ServerStopped(ServerAddress),
    /// Stop failed with an error description.
    StopFailed(String),
}

/// Records lifecycle events for assertions.
#[derive(Debug, Default)]
pub struct RecordingLifecycleReporter {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingLifecycleReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: LifecycleEvent) {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .push(event);
    }
}

impl LifecycleReporter for RecordingLifecycleReporter {
    fn start_requested(&self, milestone: Milestone) {
        self.record(LifecycleEvent::StartRequested(milestone));
    }

    fn server_running(&self, server: &ServerHandle) {
        self.record(LifecycleEvent::ServerRunning(server.address().clone()));
    }

    fn start_failed(&self, error: &LifecycleError) {
        self.record(LifecycleEvent::StartFailed(error.to_string()));
    }

    fn stop_requested(&self, server: &ServerHandle) {
        self.record(LifecycleEvent::StopRequested(server.address().clone()));
    }

    fn server_stopped(&self, address: &ServerAddress) {
        self.record(LifecycleEvent::ServerStopped(address.clone()));
    }

    fn stop_failed(&self, error: &LifecycleError) {
        self.record(LifecycleEvent::StopFailed(error.to_string()));
    }
}
