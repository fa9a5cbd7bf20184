//! Launching the server binary as a child process.

use std::io;
use std::time::Duration;

use nix::errno::Errno;
use thiserror::Error;

use crate::client::ServerAddress;

mod child;
mod launcher;
mod readiness;

pub use launcher::CommandLauncher;

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
pub(crate) const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Errors surfaced while launching or stopping the server process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The data directory could not be created.
    #[error("failed to create data directory: {source}")]
    DataDirectory {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// No port could be reserved on the bind address.
    #[error("failed to reserve a port on '{host}': {source}")]
    Port {
        /// Bind address.
        host: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The executable could not be spawned.
    #[error("failed to spawn '{executable}': {source}")]
    Spawn {
        /// Executable that failed to start.
        executable: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The process exited before accepting connections.
    #[error("server exited during startup with {status}")]
    Exited {
        /// Exit status reported by the operating system.
        status: String,
    },
    /// The process did not accept connections in time.
    #[error("server at {address} did not accept connections within {timeout_ms} ms")]
    StartupTimeout {
        /// Address being polled.
        address: ServerAddress,
        /// Startup budget in milliseconds.
        timeout_ms: u128,
    },
    /// Signalling the process failed.
    #[error("failed to signal server process {pid}: {source}")]
    Signal {
        /// Process id.
        pid: u32,
        /// Underlying OS error.
        source: Errno,
    },
    /// Waiting for the process failed.
    #[error("failed to wait for server process {pid}: {source}")]
    Wait {
        /// Process id.
        pid: u32,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// A launched server process.
pub trait ServerProcess: Send {
    /// Address the process accepts connections on.
    fn address(&self) -> &ServerAddress;

    /// Operating system process id, when known.
    fn pid(&self) -> Option<u32>;

    /// Stops the process and releases the resources it holds.
    fn stop(self: Box<Self>) -> Result<(), LaunchError>;
}

/// Starts server processes.
#[cfg_attr(test, mockall::automock)]
pub trait Launcher: Send + Sync {
    /// Launches a server and waits until it accepts connections.
    fn launch(&self) -> Result<Box<dyn ServerProcess>, LaunchError>;
}
