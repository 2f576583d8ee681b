//! Shared error types for the services crate.

use std::time::Duration;

use thiserror::Error;

use lingo_core::model::DeckError;
use storage::repository::StorageError;

/// Errors that prevent a review session from starting.
///
/// `EmptyDeck` and `LoadFailed` are deliberately distinct: the first means
/// "nothing to review", the second means "could not start".
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no cards available for review")]
    EmptyDeck,
    #[error("failed to start session: statuses could not be loaded: {0}")]
    LoadFailed(#[source] StorageError),
    #[error(transparent)]
    Deck(#[from] DeckError),
}

/// A persistence request that did not succeed.
///
/// Never returned across the presentation boundary; it travels inside a
/// `WriteOutcome` and is reported through the snapshot's error channel.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("write timed out after {0:?}")]
    TimedOut(Duration),
    #[error("write task aborted: {0}")]
    Aborted(String),
}
