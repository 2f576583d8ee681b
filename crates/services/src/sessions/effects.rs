use lingo_core::model::CardId;
use serde::Serialize;
use storage::repository::{BulkReset, StatusWrite, WriteAck};

use crate::error::WriteError;

/// Outbound persistence request produced by a review session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    WriteStatus(StatusWrite),
    BulkReset(BulkReset),
}

impl Effect {
    #[must_use]
    pub fn revision(&self) -> u64 {
        match self {
            Self::WriteStatus(write) => write.revision,
            Self::BulkReset(reset) => reset.revision,
        }
    }

    #[must_use]
    pub fn scope(&self) -> WriteScope {
        match self {
            Self::WriteStatus(write) => WriteScope::Card(write.card_id),
            Self::BulkReset(_) => WriteScope::AllCards,
        }
    }
}

/// What a persistence request touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteScope {
    Card(CardId),
    AllCards,
}

/// Completion report the worker sends back to the session owner.
#[derive(Debug)]
pub struct WriteOutcome {
    pub revision: u64,
    pub scope: WriteScope,
    pub result: Result<WriteAck, WriteError>,
}

impl WriteOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Storage,
    TimedOut,
    /// The store already held a newer revision and discarded the write.
    Rejected,
    /// The write task stopped before reporting.
    Aborted,
}

/// Last persistence failure, as shown to the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistenceFailure {
    pub revision: u64,
    pub scope: WriteScope,
    pub reason: FailureReason,
    pub message: String,
}

impl PersistenceFailure {
    pub(crate) fn from_error(revision: u64, scope: WriteScope, err: &WriteError) -> Self {
        let reason = match err {
            WriteError::TimedOut(_) => FailureReason::TimedOut,
            WriteError::Storage(_) => FailureReason::Storage,
            WriteError::Aborted(_) => FailureReason::Aborted,
        };
        Self {
            revision,
            scope,
            reason,
            message: err.to_string(),
        }
    }

    pub(crate) fn rejected(revision: u64, scope: WriteScope) -> Self {
        Self {
            revision,
            scope,
            reason: FailureReason::Rejected,
            message: "the store holds a newer change".into(),
        }
    }
}
