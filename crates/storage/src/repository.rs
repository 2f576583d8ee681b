use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lingo_core::model::{CardId, ExerciseKind, LanguageId, MasteryStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A single-card status change requested by a review session.
///
/// `revision` grows strictly within a session and sessions are seeded from the
/// clock, so a higher revision is always the later intent for that card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusWrite {
    pub card_id: CardId,
    pub language_id: LanguageId,
    pub kind: ExerciseKind,
    pub status: MasteryStatus,
    pub revision: u64,
    pub requested_at: DateTime<Utc>,
}

/// Reset of every tracked status for one language and exercise kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkReset {
    pub language_id: LanguageId,
    pub kind: ExerciseKind,
    pub revision: u64,
    pub requested_at: DateTime<Utc>,
}

/// Result of a successful write. `applied == false` means the write was stale
/// and the adapter discarded it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteAck {
    pub applied: bool,
}

impl WriteAck {
    #[must_use]
    pub fn applied() -> Self {
        Self { applied: true }
    }

    #[must_use]
    pub fn discarded() -> Self {
        Self { applied: false }
    }
}

/// Persistence port for mastery statuses.
///
/// Adapters must discard a single-card write whose revision does not exceed
/// both the stored revision for that card and the last bulk-reset revision
/// for its language and kind.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Load every stored status for a language and exercise kind.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the statuses cannot be read.
    async fn load_statuses(
        &self,
        language_id: LanguageId,
        kind: ExerciseKind,
    ) -> Result<HashMap<CardId, MasteryStatus>, StorageError>;

    /// Highest revision the store holds for a language and exercise kind,
    /// counting both card rows and the bulk-reset watermark. `0` when empty.
    ///
    /// Sessions start their revisions above this, so a clock that reads
    /// earlier than a previous session's cannot produce stale writes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the revisions cannot be read.
    async fn revision_floor(
        &self,
        language_id: LanguageId,
        kind: ExerciseKind,
    ) -> Result<u64, StorageError>;

    /// Record one card's status.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write cannot be stored.
    async fn write_status(&self, write: &StatusWrite) -> Result<WriteAck, StorageError>;

    /// Reset all statuses for a language and exercise kind to `Unseen`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the reset cannot be stored.
    async fn write_bulk_reset(&self, reset: &BulkReset) -> Result<WriteAck, StorageError>;
}

type Scope = (LanguageId, ExerciseKind);

#[derive(Debug, Clone, Copy)]
struct StoredStatus {
    status: MasteryStatus,
    revision: u64,
}

#[derive(Default)]
struct ProgressState {
    statuses: HashMap<(LanguageId, ExerciseKind, CardId), StoredStatus>,
    resets: HashMap<Scope, u64>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<ProgressState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored revision for a card, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn revision_of(
        &self,
        language_id: LanguageId,
        kind: ExerciseKind,
        card_id: CardId,
    ) -> Result<Option<u64>, StorageError> {
        let guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .statuses
            .get(&(language_id, kind, card_id))
            .map(|s| s.revision))
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_statuses(
        &self,
        language_id: LanguageId,
        kind: ExerciseKind,
    ) -> Result<HashMap<CardId, MasteryStatus>, StorageError> {
        let guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .statuses
            .iter()
            .filter(|((lang, k, _), _)| *lang == language_id && *k == kind)
            .map(|((_, _, card_id), stored)| (*card_id, stored.status))
            .collect())
    }

    async fn revision_floor(
        &self,
        language_id: LanguageId,
        kind: ExerciseKind,
    ) -> Result<u64, StorageError> {
        let guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let rows = guard
            .statuses
            .iter()
            .filter(|((lang, k, _), _)| *lang == language_id && *k == kind)
            .map(|(_, stored)| stored.revision);
        let watermark = guard.resets.get(&(language_id, kind)).copied();
        Ok(rows.chain(watermark).max().unwrap_or(0))
    }

    async fn write_status(&self, write: &StatusWrite) -> Result<WriteAck, StorageError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let fenced = guard
            .resets
            .get(&(write.language_id, write.kind))
            .is_some_and(|watermark| write.revision <= *watermark);
        if fenced {
            return Ok(WriteAck::discarded());
        }

        let key = (write.language_id, write.kind, write.card_id);
        if let Some(existing) = guard.statuses.get(&key) {
            if existing.revision >= write.revision {
                return Ok(WriteAck::discarded());
            }
        }

        guard.statuses.insert(
            key,
            StoredStatus {
                status: write.status,
                revision: write.revision,
            },
        );
        Ok(WriteAck::applied())
    }

    async fn write_bulk_reset(&self, reset: &BulkReset) -> Result<WriteAck, StorageError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let scope = (reset.language_id, reset.kind);
        if guard.resets.get(&scope).is_some_and(|w| *w >= reset.revision) {
            return Ok(WriteAck::discarded());
        }
        guard.resets.insert(scope, reset.revision);

        for ((lang, kind, _), stored) in &mut guard.statuses {
            if *lang == reset.language_id && *kind == reset.kind && stored.revision < reset.revision
            {
                stored.status = MasteryStatus::Unseen;
                stored.revision = reset.revision;
            }
        }
        Ok(WriteAck::applied())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let progress: Arc<dyn ProgressRepository> = Arc::new(InMemoryRepository::new());
        Self { progress }
    }
}
