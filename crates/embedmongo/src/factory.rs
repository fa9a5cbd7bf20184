//! Assembly of controllers from configuration.

use std::sync::Arc;

use camino::Utf8PathBuf;

use embedmongo_config::{Config, ConfigError};

use crate::access::UserAccess;
use crate::awaiter::Interrupt;
use crate::client::DatabaseClient;
use crate::controller::ServerController;
use crate::graph::{LaunchGraph, TransitionGraph};
use crate::observer::Observers;
use crate::process::CommandLauncher;
use crate::replica::ReplicaSetInit;
use crate::reporter::{LifecycleReporter, StructuredLifecycleReporter};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the harness configuration.
    fn load(&self) -> Result<Config, ConfigError>;
}

/// Loader returning a configuration built in code.
#[derive(Debug, Default, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Ok(self.config.clone())
    }
}

/// Loader reading a TOML file.
#[derive(Debug, Clone)]
pub struct FileConfigLoader {
    path: Utf8PathBuf,
}

impl FileConfigLoader {
    /// Reads configuration from `path` on every load.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigLoader for FileConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Config::load_from_path(&self.path)
    }
}

/// Builds observer sets and controllers for one configuration.
pub struct ServerFactory {
    config: Config,
    client: Arc<dyn DatabaseClient>,
    reporter: Arc<dyn LifecycleReporter>,
    interrupt: Interrupt,
}

impl ServerFactory {
    /// Builds a factory reporting through [`StructuredLifecycleReporter`].
    #[must_use]
    pub fn new(config: Config, client: Arc<dyn DatabaseClient>) -> Self {
        Self {
            config,
            client,
            reporter: Arc::new(StructuredLifecycleReporter::new()),
            interrupt: Interrupt::new(),
        }
    }

    /// Builds a factory from the configuration supplied by `loader`.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when configuration cannot be loaded.
    pub fn from_loader(
        loader: &dyn ConfigLoader,
        client: Arc<dyn DatabaseClient>,
    ) -> Result<Self, ConfigError> {
        loader.load().map(|config| Self::new(config, client))
    }

    /// Replaces the lifecycle reporter handed to controllers.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn LifecycleReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Shares `interrupt` with every bootstrap command, so raising it from
    /// another thread abandons a `start()` or `stop()` blocked on a reply.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Interrupt shared with the bootstrap commands.
    #[must_use]
    pub const fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Installs the global subscriber described by the `logging` table.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError`] when the filter is malformed or another
    /// subscriber is already installed.
    pub fn initialise_telemetry(&self) -> Result<TelemetryHandle, TelemetryError> {
        telemetry::initialise(&self.config.logging)
    }

    /// Resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Observers for the configured server: the access bootstrap when a user
    /// is configured, followed by replica set initiation when enabled.
    #[must_use]
    pub fn observers(&self) -> Observers {
        let access = self.config.access.as_ref().map_or_else(Observers::empty, |access| {
            UserAccess::new(Arc::clone(&self.client), self.config.database.clone(), access)
                .with_interrupt(self.interrupt.clone())
                .observers()
        });
        let replica = ReplicaSetInit::new(Arc::clone(&self.client))
            .with_interrupt(self.interrupt.clone())
            .observers(&self.config);
        Observers::compose([access, replica])
    }

    /// Builds an idle controller over `graph`.
    #[must_use]
    pub fn controller<G: TransitionGraph>(&self, graph: G) -> ServerController<G> {
        ServerController::new(graph, self.observers(), Arc::clone(&self.reporter))
    }

    /// Builds an idle controller launching the configured executable.
    #[must_use]
    pub fn launch_controller(&self) -> ServerController<LaunchGraph<CommandLauncher>> {
        self.controller(LaunchGraph::new(CommandLauncher::from_config(&self.config)))
    }
}
