//! Test double for [`DatabaseClient`] that records every request and replies
//! from a script.
//!
//! Unscripted commands succeed with `{ "ok": 1.0 }` and every database name
//! resolves unless denied. Connections are counted when opened and when
//! dropped so tests can check that none outlive a command.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use futures::stream;
use serde_json::json;

use crate::client::{
    ClientError, CommandReply, Connection, Credential, DatabaseClient, Document, ServerAddress,
};

/// Requests observed by the client, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCall {
    /// A command ran against `database`.
    Command {
        /// Target database.
        database: String,
        /// Credential the connection was opened with.
        credential: Option<Credential>,
        /// Command document.
        command: Document,
    },
    /// The identity of `database` was resolved.
    DatabaseName {
        /// Database being resolved.
        database: String,
        /// Credential the connection was opened with.
        credential: Option<Credential>,
    },
}

impl ClientCall {
    /// Name of the command, taken from the first key of the document.
    #[must_use]
    pub fn command_name(&self) -> Option<String> {
        match self {
            Self::Command { command, .. } => command_name(command),
            Self::DatabaseName { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
enum ScriptedReply {
    Document(Document),
    Error(String),
    Empty,
    Pending,
}

#[derive(Default)]
struct ClientState {
    calls: Vec<ClientCall>,
    replies: HashMap<(String, String), ScriptedReply>,
    denied: BTreeSet<String>,
    connect_failure: Option<String>,
    addresses: Vec<ServerAddress>,
    opened: usize,
    closed: usize,
}

/// Client that records requests and supports scripted replies.
#[derive(Clone, Default)]
pub struct RecordingClient {
    state: Arc<Mutex<ClientState>>,
}

impl RecordingClient {
    /// Replies to `command` on `database` with `reply` from now on.
    pub fn reply_with(&self, command: &str, database: &str, reply: Document) {
        self.script(command, database, ScriptedReply::Document(reply));
    }

    /// Answers `command` on `database` with `{ "ok": 0.0 }`.
    pub fn reject(&self, command: &str, database: &str) {
        self.reply_with(command, database, json!({ "ok": 0.0, "errmsg": "rejected" }));
    }

    /// Publishes an error for `command` on `database`.
    pub fn fail_with(&self, command: &str, database: &str, message: impl Into<String>) {
        self.script(command, database, ScriptedReply::Error(message.into()));
    }

    /// Completes `command` on `database` without publishing a reply.
    pub fn reply_empty(&self, command: &str, database: &str) {
        self.script(command, database, ScriptedReply::Empty);
    }

    /// Leaves `command` on `database` waiting for a reply that never arrives.
    pub fn reply_pending(&self, command: &str, database: &str) {
        self.script(command, database, ScriptedReply::Pending);
    }

    /// Makes `database` unresolvable for every connection.
    pub fn deny_database(&self, database: &str) {
        self.lock().denied.insert(database.to_owned());
    }

    /// Makes every connection attempt fail.
    pub fn refuse_connections(&self, message: impl Into<String>) {
        self.lock().connect_failure = Some(message.into());
    }

    /// Drops every script and recorded call.
    pub fn reset(&self) {
        *self.lock() = ClientState::default();
    }

    /// Recorded calls, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<ClientCall> {
        self.lock().calls.clone()
    }

    /// Names of recorded commands, in arrival order.
    #[must_use]
    pub fn command_names(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(ClientCall::command_name)
            .collect()
    }

    /// Returns `true` when a database identity lookup was attempted.
    #[must_use]
    pub fn resolved_database(&self) -> bool {
        self.lock()
            .calls
            .iter()
            .any(|call| matches!(call, ClientCall::DatabaseName { .. }))
    }

    /// Addresses connected to, one per successful connection.
    #[must_use]
    pub fn addresses(&self) -> Vec<ServerAddress> {
        self.lock().addresses.clone()
    }

    /// Number of connections opened so far.
    #[must_use]
    pub fn opened(&self) -> usize {
        self.lock().opened
    }

    /// Number of connections still open.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        let state = self.lock();
        state.opened - state.closed
    }

    fn script(&self, command: &str, database: &str, reply: ScriptedReply) {
        self.lock()
            .replies
            .insert((command.to_owned(), database.to_owned()), reply);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClientState> {
        self.state.lock().expect("client state mutex poisoned")
    }
}

impl DatabaseClient for RecordingClient {
    fn connect(
        &self,
        address: &ServerAddress,
        credential: Option<&Credential>,
    ) -> Result<Box<dyn Connection>, ClientError> {
        let mut state = self.lock();
        if let Some(message) = &state.connect_failure {
            return Err(ClientError::new(message.clone()));
        }
        state.opened += 1;
        state.addresses.push(address.clone());
        Ok(Box::new(RecordingConnection {
            state: Arc::clone(&self.state),
            credential: credential.cloned(),
        }))
    }
}

struct RecordingConnection {
    state: Arc<Mutex<ClientState>>,
    credential: Option<Credential>,
}

impl Connection for RecordingConnection {
    fn database_name(&self, database: &str) -> Option<String> {
        let mut state = self.state.lock().expect("client state mutex poisoned");
        state.calls.push(ClientCall::DatabaseName {
            database: database.to_owned(),
            credential: self.credential.clone(),
        });
        (!state.denied.contains(database)).then(|| database.to_owned())
    }

    fn run_command(&self, database: &str, command: Document) -> CommandReply {
        let mut state = self.state.lock().expect("client state mutex poisoned");
        let key = (
            command_name(&command).unwrap_or_default(),
            database.to_owned(),
        );
        let scripted = state
            .replies
            .get(&key)
            .cloned()
            .unwrap_or_else(|| ScriptedReply::Document(json!({ "ok": 1.0 })));
        state.calls.push(ClientCall::Command {
            database: database.to_owned(),
            credential: self.credential.clone(),
            command,
        });
        match scripted {
            ScriptedReply::Document(reply) => stream::once(async move { Ok(reply) }).boxed(),
            ScriptedReply::Error(message) => {
                stream::once(async move { Err(ClientError::new(message)) }).boxed()
            }
            ScriptedReply::Empty => stream::empty().boxed(),
            ScriptedReply::Pending => stream::pending().boxed(),
        }
    }
}

impl Drop for RecordingConnection {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.closed += 1;
        }
    }
}

fn command_name(command: &Document) -> Option<String> {
    command
        .as_object()
        .and_then(|fields| fields.keys().next().cloned())
}
