//! Blocking bridge from single-value command replies to synchronous callers.
//!
//! Bootstrap commands are issued through an asynchronous client, while the
//! lifecycle controller and its observers are synchronous. [`Awaiter`] is the
//! one place where the two meet: it drives a reply stream on a private
//! current-thread runtime until the first item arrives and then drops the
//! stream, so at most one item is ever requested.

use std::error::Error as StdError;
use std::io;
use std::pin::pin;

use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Boxed error used for causes reported by collaborators.
pub type BoxError = Box<dyn StdError + Send + Sync>;

const AWAIT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::await");

/// Errors surfaced while waiting for a single reply.
#[derive(Debug, Error)]
pub enum AwaitError {
    /// The private runtime could not be created.
    #[error("failed to start async runtime: {source}")]
    Runtime {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The source completed without publishing a value.
    #[error("expected value, got none")]
    Empty,
    /// The wait was interrupted before a value arrived.
    #[error("wait for reply was interrupted")]
    Cancelled,
    /// The source published an error.
    #[error("asynchronous operation failed: {source}")]
    Failed {
        /// Error published by the source.
        #[source]
        source: BoxError,
    },
}

/// Sticky interruption flag shared with the thread blocked in [`Awaiter::get`].
///
/// Once raised the flag stays raised, so every later wait through the same
/// interrupt fails with [`AwaitError::Cancelled`] without polling its source.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    token: CancellationToken,
}

impl Interrupt {
    /// Creates a flag that has not been raised.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag, waking any blocked wait.
    pub fn interrupt(&self) {
        self.token.cancel();
    }

    /// Returns `true` once the flag has been raised.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Blocks the calling thread until a single-value source resolves.
///
/// `Awaiter` owns a current-thread runtime, so [`Awaiter::get`] must be
/// called from synchronous code; calling it from inside another runtime's
/// task panics inside tokio.
#[derive(Debug)]
pub struct Awaiter {
    runtime: Runtime,
    interrupt: Interrupt,
}

impl Awaiter {
    /// Builds an awaiter with a fresh interrupt flag.
    pub fn new() -> Result<Self, AwaitError> {
        Self::with_interrupt(Interrupt::new())
    }

    /// Builds an awaiter observing an existing interrupt flag.
    pub fn with_interrupt(interrupt: Interrupt) -> Result<Self, AwaitError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| AwaitError::Runtime { source })?;
        Ok(Self { runtime, interrupt })
    }

    /// The interrupt flag observed by this awaiter.
    #[must_use]
    pub const fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Waits for the first item of `source`.
    ///
    /// Returns the published value, [`AwaitError::Failed`] carrying the
    /// published error, [`AwaitError::Empty`] when the source completes
    /// without a value, or [`AwaitError::Cancelled`] when the interrupt is
    /// raised first. The source is dropped as soon as the first item arrives.
    pub fn get<T, E, S>(&self, source: S) -> Result<T, AwaitError>
    where
        S: Stream<Item = Result<T, E>>,
        E: Into<BoxError>,
    {
        let token = self.interrupt.token.clone();
        let outcome = self.runtime.block_on(async move {
            let mut pending = pin!(source);
            tokio::select! {
                biased;
                () = token.cancelled() => Err(AwaitError::Cancelled),
                item = pending.next() => match item {
                    Some(Ok(value)) => Ok(value),
                    Some(Err(error)) => Err(AwaitError::Failed { source: error.into() }),
                    None => Err(AwaitError::Empty),
                },
            }
        });
        if matches!(outcome, Err(AwaitError::Cancelled)) {
            warn!(target: AWAIT_TARGET, "wait for reply interrupted");
        }
        outcome
    }
}
