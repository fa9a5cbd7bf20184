//! BDD test world: configuration, client double, graph double and controller
//! state for step functions.

use std::cell::RefCell;
use std::sync::Arc;

use embedmongo_config::{AccessConfig, Config, ReplicationConfig, ServerVersion};

use crate::client::ServerAddress;
use crate::controller::{ControllerStatus, LifecycleError, ServerController};
use crate::factory::ServerFactory;

use super::client::RecordingClient;
use super::graph::FakeGraph;
use super::reporter::RecordingLifecycleReporter;

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    pub client: RecordingClient,
    pub graph: FakeGraph,
    pub reporter: Arc<RecordingLifecycleReporter>,
    config: Config,
    controller: Option<ServerController<FakeGraph>>,
    start_result: Option<Result<ServerAddress, LifecycleError>>,
    stop_result: Option<Result<(), LifecycleError>>,
}

impl TestWorld {
    /// Builds a world with the default configuration and no controller.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: RecordingClient::default(),
            graph: FakeGraph::default(),
            reporter: Arc::new(RecordingLifecycleReporter::default()),
            config: Config::default(),
            controller: None,
            start_result: None,
            stop_result: None,
        }
    }

    /// Configures the user provisioned on start.
    pub fn configure_access(&mut self, database: &str, username: &str, password: &str) {
        self.config.database = database.to_owned();
        self.config.access = Some(AccessConfig::new(username, password));
    }

    /// Configures a replica set.
    pub fn configure_replication(&mut self, name: &str) {
        self.config.replication = Some(ReplicationConfig::new(name));
    }

    /// Sets the server version.
    pub fn configure_version(&mut self, version: ServerVersion) {
        self.config.version = version;
    }

    /// Starts the controller, building it on first use.
    pub fn start(&mut self) {
        let controller = self.controller();
        let result = controller.start().map(|server| server.address().clone());
        self.start_result = Some(result);
    }

    /// Stops the controller, building it on first use.
    pub fn stop(&mut self) {
        let result = self.controller().stop();
        self.stop_result = Some(result);
    }

    /// Result of the last start, if any.
    #[must_use]
    pub fn start_result(&self) -> Option<&Result<ServerAddress, LifecycleError>> {
        self.start_result.as_ref()
    }

    /// Result of the last stop, if any.
    #[must_use]
    pub fn stop_result(&self) -> Option<&Result<(), LifecycleError>> {
        self.stop_result.as_ref()
    }

    /// Controller status, or `None` before one was built.
    #[must_use]
    pub fn status(&self) -> Option<ControllerStatus> {
        self.controller.as_ref().map(ServerController::status)
    }

    fn controller(&mut self) -> &mut ServerController<FakeGraph> {
        let factory = ServerFactory::new(self.config.clone(), Arc::new(self.client.clone()))
            .with_reporter(self.reporter.clone());
        let graph = self.graph.clone();
        self.controller
            .get_or_insert_with(|| factory.controller(graph))
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default test world fixture.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
