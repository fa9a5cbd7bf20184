//! Contract of the asynchronous database client used by bootstrap commands.
//!
//! The harness does not speak the server's wire protocol itself. Callers plug
//! in any client able to open an authenticated connection and run a single
//! administrative command, returning the reply as a single-value stream.

use std::fmt;

use futures::stream::BoxStream;
use thiserror::Error;

use crate::awaiter::BoxError;

/// Structured command request or reply.
pub type Document = serde_json::Value;

/// Single-value stream carrying a command reply.
pub type CommandReply = BoxStream<'static, Result<Document, ClientError>>;

/// Network address of a running server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    host: String,
    port: u16,
}

impl ServerAddress {
    /// Builds an address from host and port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host name or IP address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.host, self.port)
    }
}

/// Username and password bound to the database that authenticates them.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    username: String,
    password: String,
    source: String,
}

impl Credential {
    /// Builds a credential authenticated against the `source` database.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            source: source.into(),
        }
    }

    /// User name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Authentication database.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}@{}", self.username, self.source)
    }
}

/// Failure reported by the client collaborator.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ClientError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ClientError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source.
    #[must_use]
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-readable message describing the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Opens connections to a running server.
pub trait DatabaseClient: Send + Sync {
    /// Connects to `address`, authenticating with `credential` when supplied.
    ///
    /// The returned connection is closed when dropped.
    fn connect(
        &self,
        address: &ServerAddress,
        credential: Option<&Credential>,
    ) -> Result<Box<dyn Connection>, ClientError>;
}

/// An open connection able to run administrative commands.
pub trait Connection: Send {
    /// Resolves the identity of `database`, or `None` when the handle is
    /// unavailable to this connection.
    fn database_name(&self, database: &str) -> Option<String>;

    /// Runs `command` against `database`.
    fn run_command(&self, database: &str, command: Document) -> CommandReply;
}
