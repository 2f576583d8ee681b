use std::sync::Arc;
use std::time::Duration;

use storage::repository::{ProgressRepository, WriteAck};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::error::WriteError;

use super::effects::{Effect, WriteOutcome};

const WRITE_TIMEOUT_ENV: &str = "LINGO_WRITE_TIMEOUT_MS";
const WRITE_ATTEMPTS_ENV: &str = "LINGO_WRITE_ATTEMPTS";
const WRITE_BACKOFF_ENV: &str = "LINGO_WRITE_BACKOFF_MS";

/// Timeout and retry policy for background writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Upper bound for a single attempt.
    pub write_timeout: Duration,
    /// Total attempts per request, including the first. Never below 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each one after.
    pub retry_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            write_timeout: Duration::from_millis(5_000),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

impl WorkerConfig {
    /// Defaults overridden by `LINGO_WRITE_TIMEOUT_MS`, `LINGO_WRITE_ATTEMPTS`
    /// and `LINGO_WRITE_BACKOFF_MS`. Unparseable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str| parse_env::<u64>(key, lookup(key)).map(Duration::from_millis);

        Self {
            write_timeout: millis(WRITE_TIMEOUT_ENV).unwrap_or(defaults.write_timeout),
            max_attempts: parse_env::<u32>(WRITE_ATTEMPTS_ENV, lookup(WRITE_ATTEMPTS_ENV))
                .unwrap_or(defaults.max_attempts)
                .max(1),
            retry_backoff: millis(WRITE_BACKOFF_ENV).unwrap_or(defaults.retry_backoff),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring invalid setting");
            None
        }
    }
}

/// Executes session effects in the background.
///
/// Each submitted effect runs on its own task, so a slow write never blocks the
/// session. Completion order across effects is not guaranteed; stores rely on
/// revisions to discard stale writes.
#[derive(Clone)]
pub struct PersistenceWorker {
    progress: Arc<dyn ProgressRepository>,
    config: WorkerConfig,
    outcomes: mpsc::UnboundedSender<WriteOutcome>,
}

impl PersistenceWorker {
    /// Create a worker and the channel its outcomes arrive on.
    #[must_use]
    pub fn new(
        progress: Arc<dyn ProgressRepository>,
        config: WorkerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<WriteOutcome>) {
        let (outcomes, rx) = mpsc::unbounded_channel();
        (
            Self {
                progress,
                config,
                outcomes,
            },
            rx,
        )
    }

    #[must_use]
    pub fn config(&self) -> WorkerConfig {
        self.config
    }

    /// Start executing `effect` and return immediately.
    ///
    /// Exactly one outcome is reported per effect. A write task that panics
    /// or is cancelled reports `WriteError::Aborted`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, effect: Effect) {
        let progress = Arc::clone(&self.progress);
        let config = self.config;
        let outcomes = self.outcomes.clone();
        let revision = effect.revision();
        let scope = effect.scope();

        let write =
            tokio::spawn(async move { run_effect(progress.as_ref(), config, effect).await });

        tokio::spawn(async move {
            let outcome = match write.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(revision, ?scope, error = %err, "write task aborted");
                    WriteOutcome {
                        revision,
                        scope,
                        result: Err(WriteError::Aborted(err.to_string())),
                    }
                }
            };
            if outcomes.send(outcome).is_err() {
                debug!("session dropped before write completed");
            }
        });
    }

    pub fn submit_all(&self, effects: impl IntoIterator<Item = Effect>) {
        for effect in effects {
            self.submit(effect);
        }
    }
}

/// Run one effect to completion, retrying failed or timed-out attempts.
pub(crate) async fn run_effect(
    progress: &dyn ProgressRepository,
    config: WorkerConfig,
    effect: Effect,
) -> WriteOutcome {
    let revision = effect.revision();
    let scope = effect.scope();
    let attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    let result = loop {
        let err = match tokio::time::timeout(config.write_timeout, perform(progress, &effect)).await
        {
            Ok(Ok(ack)) => break Ok(ack),
            Ok(Err(err)) => WriteError::Storage(err),
            Err(_) => WriteError::TimedOut(config.write_timeout),
        };

        if attempt >= attempts {
            warn!(revision, ?scope, attempts, error = %err, "write failed");
            break Err(err);
        }
        debug!(revision, attempt, error = %err, "retrying write");
        tokio::time::sleep(backoff_delay(config.retry_backoff, attempt)).await;
        attempt += 1;
    };

    if let Ok(ack) = &result {
        debug!(revision, ?scope, applied = ack.applied, "write completed");
    }

    WriteOutcome {
        revision,
        scope,
        result,
    }
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1 << attempt.saturating_sub(1).min(16))
}

async fn perform(
    progress: &dyn ProgressRepository,
    effect: &Effect,
) -> Result<WriteAck, storage::repository::StorageError> {
    match effect {
        Effect::WriteStatus(write) => progress.write_status(write).await,
        Effect::BulkReset(reset) => progress.write_bulk_reset(reset).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::effects::WriteScope;
    use async_trait::async_trait;
    use lingo_core::model::{CardId, ExerciseKind, LanguageId, MasteryStatus};
    use lingo_core::time::fixed_now;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use storage::repository::{BulkReset, InMemoryRepository, StatusWrite, StorageError};

    const LANG: LanguageId = LanguageId::new(1);

    /// Fails the first `failures` writes, then delegates.
    struct FlakyRepo {
        failures: u32,
        calls: AtomicU32,
        inner: InMemoryRepository,
    }

    impl FlakyRepo {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                inner: InMemoryRepository::new(),
            }
        }

        fn fail_now(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst) < self.failures
        }
    }

    #[async_trait]
    impl ProgressRepository for FlakyRepo {
        async fn load_statuses(
            &self,
            language_id: LanguageId,
            kind: ExerciseKind,
        ) -> Result<HashMap<CardId, MasteryStatus>, StorageError> {
            self.inner.load_statuses(language_id, kind).await
        }

        async fn revision_floor(
            &self,
            language_id: LanguageId,
            kind: ExerciseKind,
        ) -> Result<u64, StorageError> {
            self.inner.revision_floor(language_id, kind).await
        }

        async fn write_status(&self, write: &StatusWrite) -> Result<WriteAck, StorageError> {
            if self.fail_now() {
                return Err(StorageError::Connection("flaky".into()));
            }
            self.inner.write_status(write).await
        }

        async fn write_bulk_reset(&self, reset: &BulkReset) -> Result<WriteAck, StorageError> {
            if self.fail_now() {
                return Err(StorageError::Connection("flaky".into()));
            }
            self.inner.write_bulk_reset(reset).await
        }
    }

    /// Never completes a write.
    struct StalledRepo;

    #[async_trait]
    impl ProgressRepository for StalledRepo {
        async fn load_statuses(
            &self,
            _language_id: LanguageId,
            _kind: ExerciseKind,
        ) -> Result<HashMap<CardId, MasteryStatus>, StorageError> {
            Ok(HashMap::new())
        }

        async fn revision_floor(
            &self,
            _language_id: LanguageId,
            _kind: ExerciseKind,
        ) -> Result<u64, StorageError> {
            Ok(0)
        }

        async fn write_status(&self, _write: &StatusWrite) -> Result<WriteAck, StorageError> {
            std::future::pending().await
        }

        async fn write_bulk_reset(&self, _reset: &BulkReset) -> Result<WriteAck, StorageError> {
            std::future::pending().await
        }
    }

    /// Panics inside every write.
    struct PanickingRepo;

    #[async_trait]
    impl ProgressRepository for PanickingRepo {
        async fn load_statuses(
            &self,
            _language_id: LanguageId,
            _kind: ExerciseKind,
        ) -> Result<HashMap<CardId, MasteryStatus>, StorageError> {
            Ok(HashMap::new())
        }

        async fn revision_floor(
            &self,
            _language_id: LanguageId,
            _kind: ExerciseKind,
        ) -> Result<u64, StorageError> {
            Ok(0)
        }

        async fn write_status(&self, _write: &StatusWrite) -> Result<WriteAck, StorageError> {
            panic!("driver bug")
        }

        async fn write_bulk_reset(&self, _reset: &BulkReset) -> Result<WriteAck, StorageError> {
            panic!("driver bug")
        }
    }

    fn status_effect(card: u64, revision: u64) -> Effect {
        Effect::WriteStatus(StatusWrite {
            card_id: CardId::new(card),
            language_id: LANG,
            kind: ExerciseKind::Vocabulary,
            status: MasteryStatus::Mastered,
            revision,
            requested_at: fixed_now(),
        })
    }

    fn config(attempts: u32) -> WorkerConfig {
        WorkerConfig {
            write_timeout: Duration::from_millis(50),
            max_attempts: attempts,
            retry_backoff: Duration::from_millis(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let repo = FlakyRepo::new(2);
        let outcome = run_effect(&repo, config(3), status_effect(1, 7)).await;
        assert!(outcome.is_success());
        assert_eq!(outcome.revision, 7);
        assert_eq!(outcome.scope, WriteScope::Card(CardId::new(1)));
        assert_eq!(repo.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_report_storage_error() {
        let repo = FlakyRepo::new(5);
        let outcome = run_effect(&repo, config(2), status_effect(1, 7)).await;
        assert!(matches!(
            outcome.result,
            Err(WriteError::Storage(StorageError::Connection(_)))
        ));
        assert_eq!(repo.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_write_times_out() {
        let outcome = run_effect(&StalledRepo, config(1), status_effect(1, 3)).await;
        assert!(matches!(outcome.result, Err(WriteError::TimedOut(d)) if d == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn submitted_effects_report_on_channel() {
        let repo = Arc::new(InMemoryRepository::new());
        let (worker, mut rx) = PersistenceWorker::new(repo.clone(), config(1));
        worker.submit_all([status_effect(1, 2), status_effect(1, 1)]);

        let mut revisions = vec![
            rx.recv().await.unwrap().revision,
            rx.recv().await.unwrap().revision,
        ];
        revisions.sort_unstable();
        assert_eq!(revisions, vec![1, 2]);

        assert_eq!(
            repo.revision_of(LANG, ExerciseKind::Vocabulary, CardId::new(1))
                .unwrap(),
            Some(2),
            "the later revision wins regardless of completion order"
        );
    }

    #[tokio::test]
    async fn panicking_write_still_reports_an_outcome() {
        let (worker, mut rx) = PersistenceWorker::new(Arc::new(PanickingRepo), config(1));
        worker.submit(status_effect(4, 9));

        let outcome = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("outcome arrives")
            .expect("channel open");
        assert_eq!(outcome.revision, 9);
        assert_eq!(outcome.scope, WriteScope::Card(CardId::new(4)));
        assert!(matches!(outcome.result, Err(WriteError::Aborted(ref msg)) if msg.contains("panic")));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(100));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(400));
    }

    #[test]
    fn env_overrides_and_bad_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (WRITE_TIMEOUT_ENV, "1500"),
            (WRITE_ATTEMPTS_ENV, "0"),
            (WRITE_BACKOFF_ENV, "soon"),
        ]);
        let config = WorkerConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_string()));
        assert_eq!(config.write_timeout, Duration::from_millis(1500));
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.retry_backoff, WorkerConfig::default().retry_backoff);
    }
}
