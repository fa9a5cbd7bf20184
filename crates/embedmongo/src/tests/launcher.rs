//! Process tests driving `CommandLauncher` with stand-in shell scripts.

use std::fs;
use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use camino::Utf8PathBuf;
use embedmongo_config::Config;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use crate::controller::ServerController;
use crate::graph::LaunchGraph;
use crate::observer::Observers;
use crate::process::{CommandLauncher, LaunchError, Launcher};

use super::support::RecordingLifecycleReporter;

struct ScriptDir {
    directory: TempDir,
}

impl ScriptDir {
    fn script(&self, name: &str, body: &str) -> Utf8PathBuf {
        let path = self.directory.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("script should be written");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("script should be executable");
        Utf8PathBuf::from_path_buf(path).expect("script path should be UTF-8")
    }
}

#[fixture]
fn scripts() -> ScriptDir {
    ScriptDir {
        directory: TempDir::new().expect("temporary directory"),
    }
}

fn config(executable: Utf8PathBuf, port: u16) -> Config {
    let mut config = Config::default();
    config.launch.executable = executable;
    config.launch.port = port;
    config.launch.startup_timeout_ms = 5_000;
    config.launch.shutdown_timeout_ms = 2_000;
    config
}

#[rstest]
fn launches_and_stops_a_long_running_process(scripts: ScriptDir) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
    let port = listener.local_addr().expect("listener address").port();
    let launcher =
        CommandLauncher::from_config(&config(scripts.script("mongod", "exec sleep 30"), port));

    let process = launcher.launch().expect("launch should succeed");

    assert_eq!(process.address().port(), port);
    assert!(process.pid().is_some());
    process.stop().expect("stop should succeed");
}

#[rstest]
fn early_exit_is_reported(scripts: ScriptDir) {
    let launcher = CommandLauncher::from_config(&config(scripts.script("mongod", "exit 3"), 0));

    let error = match launcher.launch() {
        Ok(_) => panic!("exiting process must not launch"),
        Err(error) => error,
    };

    assert!(matches!(error, LaunchError::Exited { .. }), "{error:?}");
}

#[test]
fn missing_executables_fail_to_spawn() {
    let launcher = CommandLauncher::from_config(&config(
        Utf8PathBuf::from("/nonexistent/embedmongo/mongod"),
        0,
    ));

    let error = match launcher.launch() {
        Ok(_) => panic!("missing executable must not launch"),
        Err(error) => error,
    };

    assert!(
        matches!(&error, LaunchError::Spawn { executable, .. } if executable.ends_with("mongod")),
        "{error:?}"
    );
}

#[rstest]
fn controller_runs_the_process_until_stopped(scripts: ScriptDir) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
    let port = listener.local_addr().expect("listener address").port();
    let graph = LaunchGraph::new(CommandLauncher::from_config(&config(
        scripts.script("mongod", "exec sleep 30"),
        port,
    )));
    let mut controller = ServerController::new(
        graph,
        Observers::empty(),
        Arc::new(RecordingLifecycleReporter::default()),
    );

    let pid = controller
        .start()
        .expect("start should succeed")
        .pid()
        .expect("child pid");
    assert!(pid > 0);

    controller.stop().expect("stop should succeed");
    assert!(!controller.is_running());
}
