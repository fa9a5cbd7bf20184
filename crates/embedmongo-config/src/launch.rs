use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::defaults::{
    default_bind_ip, default_executable, default_shutdown_timeout_ms, default_startup_timeout_ms,
};

/// Settings controlling how the server process is spawned.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LaunchConfig {
    /// Server binary, resolved through `PATH` when relative.
    pub executable: Utf8PathBuf,
    /// Interface the server binds to.
    pub bind_ip: String,
    /// Listening port; `0` selects a free ephemeral port at launch time.
    pub port: u16,
    /// Milliseconds allowed for the server to accept connections.
    pub startup_timeout_ms: u64,
    /// Milliseconds allowed for a graceful exit before the process is killed.
    pub shutdown_timeout_ms: u64,
    /// Additional arguments appended verbatim to the command line.
    pub extra_args: Vec<String>,
}

impl LaunchConfig {
    /// Startup budget as a [`Duration`].
    #[must_use]
    pub const fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    /// Shutdown grace period as a [`Duration`].
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            bind_ip: default_bind_ip(),
            port: 0,
            startup_timeout_ms: default_startup_timeout_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            extra_args: Vec::new(),
        }
    }
}
