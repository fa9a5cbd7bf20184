//! In-memory [`TransitionGraph`] that hands out a fixed server handle and
//! counts resolutions and releases.

use std::sync::{Arc, Mutex};

use crate::client::ServerAddress;
use crate::graph::{GraphError, RunningServer, TransitionGraph};
use crate::observer::{Milestone, Observers};
use crate::process::LaunchError;
use crate::server::ServerHandle;

/// Port reported by servers handed out by [`FakeGraph`].
pub const FAKE_PORT: u16 = 27017;

#[derive(Default)]
struct GraphState {
    resolves: usize,
    releases: usize,
    fail_launch: bool,
    fail_release: bool,
    tear_down_failures: usize,
}

/// Graph resolving milestones without launching anything.
///
/// Observer failures propagate without releasing the server, leaving cleanup
/// to the caller.
#[derive(Clone, Default)]
pub struct FakeGraph {
    state: Arc<Mutex<GraphState>>,
}

impl FakeGraph {
    /// Makes the next resolution fail before any observer runs.
    pub fn fail_next_launch(&self) {
        self.lock().fail_launch = true;
    }

    /// Makes releases fail after counting them.
    pub fn fail_release(&self) {
        self.lock().fail_release = true;
    }

    /// Number of resolution attempts.
    #[must_use]
    pub fn resolves(&self) -> usize {
        self.lock().resolves
    }

    /// Number of releases.
    #[must_use]
    pub fn releases(&self) -> usize {
        self.lock().releases
    }

    /// Number of releases during which a tear-down observer failed.
    #[must_use]
    pub fn tear_down_failures(&self) -> usize {
        self.lock().tear_down_failures
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GraphState> {
        self.state.lock().expect("graph state mutex poisoned")
    }
}

impl TransitionGraph for FakeGraph {
    fn resolve(
        &self,
        milestone: Milestone,
        observers: &Observers,
    ) -> Result<Box<dyn RunningServer>, GraphError> {
        {
            let mut state = self.lock();
            state.resolves += 1;
            if std::mem::take(&mut state.fail_launch) {
                return Err(GraphError::Launch {
                    source: LaunchError::Exited {
                        status: "exit status: 48".to_owned(),
                    },
                });
            }
        }
        let server = ServerHandle::new(ServerAddress::new("127.0.0.1", FAKE_PORT), Some(4242));
        observers
            .fire_reached(milestone, &server)
            .map_err(|source| GraphError::Observer { milestone, source })?;
        Ok(Box::new(FakeRunningServer {
            server,
            milestone,
            observers: observers.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeRunningServer {
    server: ServerHandle,
    milestone: Milestone,
    observers: Observers,
    state: Arc<Mutex<GraphState>>,
}

impl RunningServer for FakeRunningServer {
    fn server(&self) -> &ServerHandle {
        &self.server
    }

    fn release(self: Box<Self>) -> Result<(), GraphError> {
        let tear_down = self.observers.fire_tear_down(self.milestone, &self.server);
        let mut state = self.state.lock().expect("graph state mutex poisoned");
        state.releases += 1;
        if tear_down.is_err() {
            state.tear_down_failures += 1;
        }
        if state.fail_release {
            return Err(GraphError::Stop {
                source: LaunchError::Exited {
                    status: "signal: 9 (SIGKILL)".to_owned(),
                },
            });
        }
        Ok(())
    }
}
