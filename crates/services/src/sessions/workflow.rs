use std::collections::HashMap;
use std::sync::Arc;

use lingo_core::model::{Card, CardId, Deck, ExerciseKind, LanguageId, MasteryStatus};
use storage::repository::{ProgressRepository, StorageError};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::Clock;
use crate::error::SessionError;

use super::effects::WriteOutcome;
use super::engine::ReviewSession;
use super::intent::SessionIntent;
use super::snapshot::SessionSnapshot;
use super::worker::{PersistenceWorker, WorkerConfig};

const LOAD_POLICY_ENV: &str = "LINGO_LOAD_POLICY";

/// What to do when stored statuses cannot be read at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    /// Refuse to start.
    #[default]
    Strict,
    /// Start anyway with every card `Unseen`.
    DegradeToUnseen,
}

impl LoadPolicy {
    /// Accepts `strict` or `degrade`, case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "degrade" | "degrade-to-unseen" => Some(Self::DegradeToUnseen),
            _ => None,
        }
    }
}

/// Settings for sessions started by a `ReviewLoopService`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionSettings {
    pub load_policy: LoadPolicy,
    pub worker: WorkerConfig,
}

impl SessionSettings {
    /// Read `LINGO_LOAD_POLICY` and the worker variables, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let load_policy = match std::env::var(LOAD_POLICY_ENV) {
            Ok(raw) => LoadPolicy::parse(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "unknown load policy, using strict");
                LoadPolicy::Strict
            }),
            Err(_) => LoadPolicy::default(),
        };
        Self {
            load_policy,
            worker: WorkerConfig::from_env(),
        }
    }
}

/// Starts review sessions against a progress store.
#[derive(Clone)]
pub struct ReviewLoopService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
    settings: SessionSettings,
}

impl ReviewLoopService {
    #[must_use]
    pub fn new(clock: Clock, progress: Arc<dyn ProgressRepository>) -> Self {
        Self {
            clock,
            progress,
            settings: SessionSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    /// Load stored statuses for `deck` and start a session over it.
    ///
    /// The session's revisions start above both the clock seed and the
    /// store's revision floor, so its writes outrank every earlier session's
    /// even when this machine's clock reads earlier.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyDeck` if the deck has no cards, or
    /// `SessionError::LoadFailed` if statuses cannot be read under the strict
    /// load policy.
    pub async fn start_session(&self, deck: Deck) -> Result<ReviewLoop, SessionError> {
        if deck.is_empty() {
            return Err(SessionError::EmptyDeck);
        }

        let (initial, floor) = match self.load_progress(deck.language_id(), deck.kind()).await {
            Ok(loaded) => loaded,
            Err(err) => match self.settings.load_policy {
                LoadPolicy::Strict => return Err(SessionError::LoadFailed(err)),
                LoadPolicy::DegradeToUnseen => {
                    warn!(error = %err, "status load failed, starting with every card unseen");
                    (HashMap::new(), 0)
                }
            },
        };

        info!(
            language = %deck.language_id(),
            kind = %deck.kind(),
            cards = deck.len(),
            stored = initial.len(),
            floor,
            "review session started"
        );

        let session = ReviewSession::initialize(deck, &initial)?
            .with_clock(self.clock)
            .with_revision_floor(floor);
        let (worker, outcomes) =
            PersistenceWorker::new(Arc::clone(&self.progress), self.settings.worker);
        Ok(ReviewLoop {
            session,
            worker,
            outcomes,
        })
    }

    async fn load_progress(
        &self,
        language_id: LanguageId,
        kind: ExerciseKind,
    ) -> Result<(HashMap<CardId, MasteryStatus>, u64), StorageError> {
        let statuses = self.progress.load_statuses(language_id, kind).await?;
        let floor = self.progress.revision_floor(language_id, kind).await?;
        Ok((statuses, floor))
    }

    /// Build a deck from `cards` and start a session over it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Deck` if the cards do not form a valid deck,
    /// otherwise the same errors as [`Self::start_session`].
    pub async fn start_session_from_cards(
        &self,
        language_id: LanguageId,
        kind: ExerciseKind,
        cards: Vec<Card>,
    ) -> Result<ReviewLoop, SessionError> {
        let deck = Deck::new(language_id, kind, cards)?;
        self.start_session(deck).await
    }
}

/// A running session wired to its persistence worker.
///
/// `dispatch` must be called from within a tokio runtime, since effects are
/// handed to background tasks.
pub struct ReviewLoop {
    session: ReviewSession,
    worker: PersistenceWorker,
    outcomes: mpsc::UnboundedReceiver<WriteOutcome>,
}

impl ReviewLoop {
    /// Fold in outcomes that have already arrived, apply the intent and hand
    /// its effects to the worker.
    pub fn dispatch(&mut self, intent: SessionIntent) -> SessionSnapshot {
        self.absorb_outcomes();
        self.session.reduce(intent);
        self.worker.submit_all(self.session.drain_effects());
        self.session.snapshot()
    }

    /// Fold every outcome that is ready without waiting. Returns how many were applied.
    pub fn absorb_outcomes(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(outcome) = self.outcomes.try_recv() {
            self.session.apply_outcome(outcome);
            applied += 1;
        }
        applied
    }

    /// Wait until every submitted write has reported back.
    ///
    /// The worker reports once per submitted effect, even when a write task
    /// panics, so this returns once the store has answered or given up.
    pub async fn settle(&mut self) -> SessionSnapshot {
        while self.session.pending_writes() > 0 {
            match self.outcomes.recv().await {
                Some(outcome) => self.session.apply_outcome(outcome),
                None => break,
            }
        }
        self.session.snapshot()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    #[must_use]
    pub fn session(&self) -> &ReviewSession {
        &self.session
    }
}
