//! Test doubles and fixtures shared by the lifecycle suites.

mod client;
mod graph;
mod reporter;
mod world;

use std::sync::Arc;

use embedmongo_config::{AccessConfig, Config};

use crate::factory::ServerFactory;

pub use client::{ClientCall, RecordingClient};
pub use graph::{FAKE_PORT, FakeGraph};
pub use reporter::{LifecycleEvent, RecordingLifecycleReporter};
pub use world::{TestWorld, world};

/// Configuration provisioning `username` with access to `database`.
#[must_use]
pub fn access_config(database: &str, username: &str, password: &str) -> Config {
    Config {
        database: database.to_owned(),
        access: Some(AccessConfig::new(username, password)),
        ..Config::default()
    }
}

/// Factory wired to the given doubles.
#[must_use]
pub fn factory(
    config: Config,
    client: &RecordingClient,
    reporter: &Arc<RecordingLifecycleReporter>,
) -> ServerFactory {
    ServerFactory::new(config, Arc::new(client.clone())).with_reporter(reporter.clone())
}
