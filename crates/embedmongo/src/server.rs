//! Handle describing a running server instance.

use crate::client::ServerAddress;

/// A running server instance, owned by the lifecycle controller that
/// started it.
///
/// The handle is deliberately not `Clone`: observers borrow it for the
/// duration of a callback and the controller releases it exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct ServerHandle {
    address: ServerAddress,
    pid: Option<u32>,
}

impl ServerHandle {
    /// Builds a handle for the server listening on `address`.
    #[must_use]
    pub const fn new(address: ServerAddress, pid: Option<u32>) -> Self {
        Self { address, pid }
    }

    /// Address the server accepts connections on.
    #[must_use]
    pub const fn address(&self) -> &ServerAddress {
        &self.address
    }

    /// Operating system process id, when the server runs as a child process.
    #[must_use]
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }
}
