use std::process::Child;
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tempfile::TempDir;
use tracing::{info, warn};

use super::{LaunchError, PROCESS_TARGET, READINESS_POLL_INTERVAL, ServerProcess};
use crate::client::ServerAddress;

/// Server running as a child of the current process.
///
/// Dropping a process that was never stopped kills it.
#[derive(Debug)]
pub(super) struct ChildProcess {
    child: Child,
    address: ServerAddress,
    data_dir: Option<TempDir>,
    shutdown_timeout: Duration,
    stopped: bool,
}

impl ChildProcess {
    pub(super) const fn new(
        child: Child,
        address: ServerAddress,
        data_dir: TempDir,
        shutdown_timeout: Duration,
    ) -> Self {
        Self {
            child,
            address,
            data_dir: Some(data_dir),
            shutdown_timeout,
            stopped: false,
        }
    }

    pub(super) fn child_mut(&mut self) -> &mut Child {
        &mut self.child
    }

    /// Sends `SIGTERM`, waits for the grace period, then kills.
    pub(super) fn terminate(&mut self) -> Result<(), LaunchError> {
        self.stopped = true;
        let pid = self.child.id();
        if self.has_exited()? {
            info!(target: PROCESS_TARGET, pid, "server process already exited");
            return Ok(());
        }
        match i32::try_from(pid) {
            Ok(raw) => match kill(Pid::from_raw(raw), Signal::SIGTERM) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(source) => return Err(LaunchError::Signal { pid, source }),
            },
            Err(_) => warn!(target: PROCESS_TARGET, pid, "pid out of range; killing"),
        }
        let deadline = Instant::now() + self.shutdown_timeout;
        while Instant::now() < deadline {
            if self.has_exited()? {
                info!(target: PROCESS_TARGET, pid, "server process exited");
                return Ok(());
            }
            thread::sleep(READINESS_POLL_INTERVAL);
        }
        warn!(
            target: PROCESS_TARGET,
            pid,
            timeout_ms = self.shutdown_timeout.as_millis(),
            "server ignored termination signal; killing"
        );
        self.child
            .kill()
            .and_then(|()| self.child.wait())
            .map(drop)
            .map_err(|source| LaunchError::Wait { pid, source })
    }

    fn has_exited(&mut self) -> Result<bool, LaunchError> {
        let pid = self.child.id();
        self.child
            .try_wait()
            .map(|status| status.is_some())
            .map_err(|source| LaunchError::Wait { pid, source })
    }

    fn remove_data_dir(&mut self) {
        if let Some(dir) = self.data_dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(error) = dir.close() {
                warn!(
                    target: PROCESS_TARGET,
                    dir = %path.display(),
                    error = %error,
                    "failed to remove data directory"
                );
            }
        }
    }
}

impl ServerProcess for ChildProcess {
    fn address(&self) -> &ServerAddress {
        &self.address
    }

    fn pid(&self) -> Option<u32> {
        Some(self.child.id())
    }

    fn stop(mut self: Box<Self>) -> Result<(), LaunchError> {
        let result = self.terminate();
        self.remove_data_dir();
        result
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if !self.stopped {
            let pid = self.child.id();
            warn!(
                target: PROCESS_TARGET,
                pid,
                "server process dropped while running; killing"
            );
            if let Err(error) = self.child.kill().and_then(|()| self.child.wait().map(drop)) {
                warn!(
                    target: PROCESS_TARGET,
                    pid,
                    error = %error,
                    "failed to kill server process"
                );
            }
        }
        self.remove_data_dir();
    }
}
