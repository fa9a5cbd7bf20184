use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{info, warn};

use embedmongo_config::{Config, LaunchConfig, ReplicationConfig};

use super::child::ChildProcess;
use super::readiness::{resolve_port, wait_until_ready};
use super::{LaunchError, Launcher, PROCESS_TARGET, ServerProcess};
use crate::client::ServerAddress;

/// Launches the configured server binary with a throwaway data directory.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    launch: LaunchConfig,
    replication: Option<ReplicationConfig>,
}

impl CommandLauncher {
    /// Builds a launcher from the launch and replication settings of
    /// `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            launch: config.launch.clone(),
            replication: config.replication.clone(),
        }
    }

    /// Command line arguments for a server listening on `port` and storing
    /// its data under `data_dir`.
    #[must_use]
    pub fn arguments(&self, port: u16, data_dir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--port".into(),
            port.to_string().into(),
            "--bind_ip".into(),
            self.launch.bind_ip.clone().into(),
            "--dbpath".into(),
            data_dir.as_os_str().to_owned(),
        ];
        if let Some(replication) = &self.replication {
            args.push("--replSet".into());
            args.push(replication.repl_set_name.clone().into());
            if let Some(size) = replication.oplog_size_mb {
                args.push("--oplogSize".into());
                args.push(size.to_string().into());
            }
        }
        args.extend(self.launch.extra_args.iter().map(OsString::from));
        args
    }
}

impl Launcher for CommandLauncher {
    fn launch(&self) -> Result<Box<dyn ServerProcess>, LaunchError> {
        let data_dir = tempfile::Builder::new()
            .prefix("embedmongo-")
            .tempdir()
            .map_err(|source| LaunchError::DataDirectory { source })?;
        let port = resolve_port(&self.launch.bind_ip, self.launch.port)?;
        let address = ServerAddress::new(self.launch.bind_ip.clone(), port);
        let executable = self.launch.executable.as_str();

        let child = Command::new(executable)
            .args(self.arguments(port, data_dir.path()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                executable: executable.to_owned(),
                source,
            })?;
        info!(
            target: PROCESS_TARGET,
            pid = child.id(),
            executable,
            address = %address,
            data_dir = %data_dir.path().display(),
            "server process spawned"
        );

        let mut process = ChildProcess::new(
            child,
            address.clone(),
            data_dir,
            self.launch.shutdown_timeout(),
        );
        match wait_until_ready(
            process.child_mut(),
            &address,
            self.launch.startup_timeout(),
        ) {
            Ok(()) => {
                info!(
                    target: PROCESS_TARGET,
                    address = %address,
                    "server accepting connections"
                );
                Ok(Box::new(process))
            }
            Err(error) => {
                warn!(
                    target: PROCESS_TARGET,
                    address = %address,
                    error = %error,
                    "server failed to become ready"
                );
                if let Err(stop_error) = process.terminate() {
                    warn!(
                        target: PROCESS_TARGET,
                        error = %stop_error,
                        "failed to stop server after startup failure"
                    );
                }
                Err(error)
            }
        }
    }
}
