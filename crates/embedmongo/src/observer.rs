//! Milestone-keyed observer registry.
//!
//! Observers are plain callbacks attached to a [`Milestone`] either when the
//! milestone is reached or when it is torn down. Independent contributors
//! (access bootstrap, replica set initiation, ...) each build their own
//! [`Observers`] set; [`Observers::compose`] merges them into the single
//! ordered set handed to the lifecycle controller.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::awaiter::BoxError;
use crate::server::ServerHandle;

/// Points in the server lifecycle at which observers may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Milestone {
    /// The server process is running and accepting connections.
    ProcessRunning,
}

impl fmt::Display for Milestone {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ProcessRunning => "process running",
        };
        formatter.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Reached,
    TearDown,
}

type Callback = Arc<dyn Fn(&ServerHandle) -> Result<(), BoxError> + Send + Sync>;

#[derive(Clone)]
struct Observer {
    milestone: Milestone,
    phase: Phase,
    name: String,
    callback: Callback,
}

/// Error raised by an observer callback.
#[derive(Debug, Error)]
#[error("observer '{observer}' failed at {milestone}: {source}")]
pub struct ObserverError {
    /// Name the observer was registered under.
    pub observer: String,
    /// Milestone being reached or torn down.
    pub milestone: Milestone,
    /// Error returned by the callback.
    #[source]
    source: BoxError,
}

impl ObserverError {
    /// Error returned by the callback.
    #[must_use]
    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.source.as_ref()
    }
}

/// Ordered set of observers, keyed by milestone.
#[derive(Clone, Default)]
pub struct Observers {
    entries: Vec<Observer>,
}

impl Observers {
    /// A set without observers.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Starts building a new set.
    #[must_use]
    pub fn builder() -> ObserversBuilder {
        ObserversBuilder::default()
    }

    /// Merges independently built sets, preserving the order of `sets` and
    /// the registration order within each set.
    #[must_use]
    pub fn compose(sets: impl IntoIterator<Item = Self>) -> Self {
        let entries = sets.into_iter().flat_map(|set| set.entries).collect();
        Self { entries }
    }

    /// Returns `true` when no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the observers run when `milestone` is reached, in order.
    #[must_use]
    pub fn reached_names(&self, milestone: Milestone) -> Vec<&str> {
        self.names(milestone, Phase::Reached)
    }

    /// Names of the observers run when `milestone` is torn down, in
    /// registration order.
    #[must_use]
    pub fn tear_down_names(&self, milestone: Milestone) -> Vec<&str> {
        self.names(milestone, Phase::TearDown)
    }

    /// Runs every observer registered for reaching `milestone`, in
    /// registration order, stopping at the first failure.
    ///
    /// Returns the number of observers run.
    pub fn fire_reached(
        &self,
        milestone: Milestone,
        server: &ServerHandle,
    ) -> Result<usize, ObserverError> {
        let mut fired = 0;
        for observer in self.matching(milestone, Phase::Reached) {
            observer.invoke(server)?;
            fired += 1;
        }
        Ok(fired)
    }

    /// Runs every observer registered for tearing down `milestone`, in
    /// reverse registration order.
    ///
    /// A failing observer does not prevent the remaining ones from running;
    /// the first failure is returned once all have run.
    pub fn fire_tear_down(
        &self,
        milestone: Milestone,
        server: &ServerHandle,
    ) -> Result<usize, ObserverError> {
        let mut fired = 0;
        let mut first_failure = None;
        for observer in self.matching(milestone, Phase::TearDown).rev() {
            fired += 1;
            if let Err(error) = observer.invoke(server) {
                first_failure.get_or_insert(error);
            }
        }
        first_failure.map_or(Ok(fired), Err)
    }

    fn matching(
        &self,
        milestone: Milestone,
        phase: Phase,
    ) -> impl DoubleEndedIterator<Item = &Observer> {
        self.entries
            .iter()
            .filter(move |observer| observer.milestone == milestone && observer.phase == phase)
    }

    fn names(&self, milestone: Milestone, phase: Phase) -> Vec<&str> {
        self.matching(milestone, phase)
            .map(|observer| observer.name.as_str())
            .collect()
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_list()
            .entries(self.entries.iter().map(|observer| {
                format!(
                    "{:?} {} {}",
                    observer.phase, observer.milestone, observer.name
                )
            }))
            .finish()
    }
}

impl Observer {
    fn invoke(&self, server: &ServerHandle) -> Result<(), ObserverError> {
        (self.callback)(server).map_err(|source| ObserverError {
            observer: self.name.clone(),
            milestone: self.milestone,
            source,
        })
    }
}

/// Builder collecting the observers of one contributor.
#[derive(Default)]
pub struct ObserversBuilder {
    entries: Vec<Observer>,
}

impl ObserversBuilder {
    /// Registers `callback` to run once `milestone` has been reached.
    #[must_use]
    pub fn on_reached<F, E>(
        self,
        milestone: Milestone,
        name: impl Into<String>,
        callback: F,
    ) -> Self
    where
        F: Fn(&ServerHandle) -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.register(milestone, Phase::Reached, name.into(), callback)
    }

    /// Registers `callback` to run before `milestone` is torn down.
    #[must_use]
    pub fn on_tear_down<F, E>(
        self,
        milestone: Milestone,
        name: impl Into<String>,
        callback: F,
    ) -> Self
    where
        F: Fn(&ServerHandle) -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.register(milestone, Phase::TearDown, name.into(), callback)
    }

    /// Finishes the set.
    #[must_use]
    pub fn build(self) -> Observers {
        Observers {
            entries: self.entries,
        }
    }

    fn register<F, E>(
        mut self,
        milestone: Milestone,
        phase: Phase,
        name: String,
        callback: F,
    ) -> Self
    where
        F: Fn(&ServerHandle) -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.entries.push(Observer {
            milestone,
            phase,
            name,
            callback: Arc::new(move |server| callback(server).map_err(Into::into)),
        });
        self
    }
}
