//! Lifecycle control for an ephemeral `mongod` used by tests.
//!
//! A [`ServerController`] drives a [`TransitionGraph`] to the
//! [`Milestone::ProcessRunning`] milestone and owns the resulting server
//! until it is stopped. Observers registered for the milestone run
//! synchronously, in registration order, before `start()` returns. Two
//! contributors are provided:
//!
//! - [`UserAccess`] creates a root user in the admin database, grants the
//!   same user `readWrite` on the target database and verifies access,
//!   aborting at the first failing step. On tear-down it asks the server to
//!   shut down with the root credential.
//! - [`ReplicaSetInit`] initiates a single-member replica set when
//!   replication is configured and the server version supports it.
//!
//! Bootstrap commands go through an asynchronous [`DatabaseClient`]; the
//! [`Awaiter`] blocks on each reply, so the controller and its observers stay
//! synchronous. [`ServerFactory`] wires observers and controllers from an
//! [`embedmongo_config::Config`], and [`LaunchGraph`] with
//! [`CommandLauncher`] runs the configured executable as a child process.

mod access;
mod awaiter;
mod client;
mod commands;
mod controller;
mod factory;
mod graph;
mod observer;
mod process;
mod replica;
mod reporter;
mod server;
pub mod telemetry;

pub use access::{BootstrapError, BootstrapOutcome, BootstrapStep, UserAccess};
pub use awaiter::{AwaitError, Awaiter, BoxError, Interrupt};
pub use client::{
    ClientError, CommandReply, Connection, Credential, DatabaseClient, Document, ServerAddress,
};
pub use commands::{
    ADMIN_DATABASE, AdminCommand, AdminCommands, CommandError, Role, VERIFY_DATABASE,
    reply_succeeded,
};
pub use controller::{ControllerStatus, LifecycleError, ServerController};
pub use factory::{ConfigLoader, FileConfigLoader, ServerFactory, StaticConfigLoader};
pub use graph::{GraphError, LaunchGraph, RunningServer, TransitionGraph};
pub use observer::{Milestone, ObserverError, Observers, ObserversBuilder};
pub use process::{CommandLauncher, LaunchError, Launcher, ServerProcess};
pub use replica::ReplicaSetInit;
pub use reporter::{LifecycleReporter, StructuredLifecycleReporter};
pub use server::ServerHandle;
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
