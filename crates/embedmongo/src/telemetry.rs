//! Structured telemetry initialisation.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use embedmongo_config::{LogFormat, LoggingConfig};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Only the first invocation installs a subscriber; later calls return a
/// fresh [`TelemetryHandle`] without touching global state. Applications
/// that already install their own subscriber should not call this.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the filter expression is
/// malformed and [`TelemetryError::Subscriber`] when another global
/// subscriber was installed first.
///
/// # Examples
///
/// ```
/// use embedmongo::telemetry;
/// use embedmongo_config::LoggingConfig;
///
/// let logging = LoggingConfig::default();
/// telemetry::initialise(&logging).expect("first call installs the subscriber");
/// telemetry::initialise(&logging).expect("later calls are no-ops");
/// ```
pub fn initialise(logging: &LoggingConfig) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(logging))
        .map(|_| TelemetryHandle)
}

fn install_subscriber(logging: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&logging.filter)
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match logging.format {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}
