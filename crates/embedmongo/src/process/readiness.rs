use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::process::Child;
use std::thread;
use std::time::{Duration, Instant};

use super::{LaunchError, READINESS_POLL_INTERVAL};
use crate::client::ServerAddress;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(200);

/// Returns `configured`, or a free port on `host` when `configured` is zero.
pub(super) fn resolve_port(host: &str, configured: u16) -> Result<u16, LaunchError> {
    if configured != 0 {
        return Ok(configured);
    }
    let port_error = |source| LaunchError::Port {
        host: host.to_owned(),
        source,
    };
    let listener = TcpListener::bind((host, 0)).map_err(port_error)?;
    let address = listener.local_addr().map_err(port_error)?;
    Ok(address.port())
}

/// Polls `address` until it accepts a TCP connection.
///
/// Fails early when `child` exits, and with
/// [`LaunchError::StartupTimeout`] once `timeout` has elapsed.
pub(super) fn wait_until_ready(
    child: &mut Child,
    address: &ServerAddress,
    timeout: Duration,
) -> Result<(), LaunchError> {
    let target = socket_address(address)?;
    let started = Instant::now();
    loop {
        let pid = child.id();
        if let Some(status) = child
            .try_wait()
            .map_err(|source| LaunchError::Wait { pid, source })?
        {
            return Err(LaunchError::Exited {
                status: status.to_string(),
            });
        }
        if TcpStream::connect_timeout(&target, CONNECT_TIMEOUT).is_ok() {
            return Ok(());
        }
        if started.elapsed() >= timeout {
            return Err(LaunchError::StartupTimeout {
                address: address.clone(),
                timeout_ms: timeout.as_millis(),
            });
        }
        thread::sleep(READINESS_POLL_INTERVAL);
    }
}

fn socket_address(address: &ServerAddress) -> Result<SocketAddr, LaunchError> {
    let port_error = |source| LaunchError::Port {
        host: address.host().to_owned(),
        source,
    };
    (address.host(), address.port())
        .to_socket_addrs()
        .map_err(port_error)?
        .next()
        .ok_or_else(|| {
            port_error(std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                "address did not resolve",
            ))
        })
}
