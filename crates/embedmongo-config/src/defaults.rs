use std::time::Duration;

use camino::Utf8PathBuf;

use crate::version::ServerVersion;

/// Database the scoped user is provisioned for when none is configured.
pub const DEFAULT_DATABASE: &str = "test";

/// Interface the server binds to by default.
pub const DEFAULT_BIND_IP: &str = "127.0.0.1";

/// Executable looked up on `PATH` when no explicit binary is configured.
pub const DEFAULT_EXECUTABLE: &str = "mongod";

/// Server version assumed when none is configured.
pub const DEFAULT_VERSION: ServerVersion = ServerVersion::new(5, 0, 5);

/// Time allowed for the server to accept connections after spawning.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Grace period between the termination signal and a forced kill.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default database name.
#[must_use]
pub fn default_database() -> String {
    DEFAULT_DATABASE.to_owned()
}

/// Default bind address.
#[must_use]
pub fn default_bind_ip() -> String {
    DEFAULT_BIND_IP.to_owned()
}

/// Default server executable.
#[must_use]
pub fn default_executable() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_EXECUTABLE)
}

/// Default startup timeout in milliseconds.
#[must_use]
pub fn default_startup_timeout_ms() -> u64 {
    duration_millis(DEFAULT_STARTUP_TIMEOUT)
}

/// Default shutdown grace period in milliseconds.
#[must_use]
pub fn default_shutdown_timeout_ms() -> u64 {
    duration_millis(DEFAULT_SHUTDOWN_TIMEOUT)
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
