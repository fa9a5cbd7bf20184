//! Configuration for ephemeral embedded database servers.
//!
//! [`Config`] gathers everything the harness needs before a server is
//! launched: which database the scoped user is provisioned for, the access
//! credentials, optional replication, the server version (which gates
//! version-dependent bootstrap steps), how the process is spawned, and how
//! logs are emitted. Every field has a default so an empty TOML document is a
//! valid configuration.

mod defaults;
mod launch;
mod logging;
mod version;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_BIND_IP, DEFAULT_DATABASE, DEFAULT_EXECUTABLE, DEFAULT_LOG_FILTER,
    DEFAULT_SHUTDOWN_TIMEOUT, DEFAULT_STARTUP_TIMEOUT, DEFAULT_VERSION, default_database,
    default_log_filter_string, default_log_format,
};
pub use launch::LaunchConfig;
pub use logging::{LogFormat, LogFormatParseError, LoggingConfig};
pub use version::{Feature, FeatureOverride, ServerVersion, VersionParseError};

/// Username and password provisioned on the server after it starts.
#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AccessConfig {
    /// User created with root privileges and with read/write on the target
    /// database.
    pub username: String,
    /// Password assigned to the user.
    pub password: String,
}

impl AccessConfig {
    /// Builds access settings for the supplied user.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for AccessConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AccessConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Replica set membership for the launched server.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReplicationConfig {
    /// Replica set name passed to the server.
    pub repl_set_name: String,
    /// Oplog size in megabytes; the server default applies when absent.
    #[serde(default)]
    pub oplog_size_mb: Option<u32>,
}

impl ReplicationConfig {
    /// Builds a replication block for the named replica set.
    #[must_use]
    pub fn new(repl_set_name: impl Into<String>) -> Self {
        Self {
            repl_set_name: repl_set_name.into(),
            oplog_size_mb: None,
        }
    }
}

/// Errors produced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration '{path}': {source}")]
    Read {
        /// File that could not be read.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The configuration document was not valid.
    #[error("invalid configuration: {source}")]
    Parse {
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}

/// Resolved harness configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Database the scoped user receives read/write access to.
    pub database: String,
    /// Credentials provisioned at startup; access control is left untouched
    /// when absent.
    pub access: Option<AccessConfig>,
    /// Replica set settings; the server runs standalone when absent.
    pub replication: Option<ReplicationConfig>,
    /// Version of the server binary.
    pub version: ServerVersion,
    /// Per-feature overrides applied on top of version detection.
    pub features: BTreeMap<Feature, FeatureOverride>,
    /// Process launch settings.
    pub launch: LaunchConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            access: None,
            replication: None,
            version: ServerVersion::default(),
            features: BTreeMap::new(),
            launch: LaunchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Parses configuration from a TOML document.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        toml::from_str(document).map_err(|source| ConfigError::Parse { source })
    }

    /// Reads and parses the TOML file at `path`.
    pub fn load_from_path(path: &Utf8Path) -> Result<Self, ConfigError> {
        let document = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&document)
    }

    /// Returns `true` when `feature` is available for the configured server.
    ///
    /// Overrides take precedence; [`FeatureOverride::Allow`] defers to the
    /// version.
    #[must_use]
    pub fn feature_enabled(&self, feature: Feature) -> bool {
        match self.features.get(&feature).copied().unwrap_or_default() {
            FeatureOverride::Force => true,
            FeatureOverride::Deny => false,
            FeatureOverride::Allow => self.version.advertises(feature),
        }
    }

    /// Returns `true` when the replica set must be initiated after startup.
    #[must_use]
    pub fn initiates_replica_set(&self) -> bool {
        self.replication.is_some() && self.feature_enabled(Feature::RsInitiate)
    }
}
