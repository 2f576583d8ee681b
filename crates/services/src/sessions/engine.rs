use std::collections::{HashMap, VecDeque};

use lingo_core::model::{
    Card, CardId, Deck, MasteryStatus, ProgressMap, RevealConfig, RevealStage,
};
use storage::repository::{BulkReset, StatusWrite};
use tracing::{debug, warn};

use crate::Clock;
use crate::error::SessionError;

use super::effects::{Effect, PersistenceFailure, WriteOutcome, WriteScope};
use super::intent::{NavigationDirection, SessionIntent};
use super::snapshot::SessionSnapshot;

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Review session state machine.
///
/// Intents are applied synchronously, one at a time; persistence is only
/// requested through the effect queue, never performed here. The progress map
/// is mutated solely by intents, and write outcomes only touch the error
/// channel.
pub struct ReviewSession {
    deck: Deck,
    reveal: RevealConfig,
    progress: ProgressMap,
    only_unmastered: bool,
    /// Deck indices of the cards that pass the filter, in deck order.
    visible: Vec<usize>,
    cursor: usize,
    stage: RevealStage,
    last_direction: Option<NavigationDirection>,
    help_visible: bool,
    clock: Clock,
    last_revision: u64,
    /// Newest revision issued per card and for bulk resets.
    issued_cards: HashMap<CardId, u64>,
    issued_reset: Option<u64>,
    effects: VecDeque<Effect>,
    pending_writes: usize,
    last_error: Option<PersistenceFailure>,
}

impl ReviewSession {
    /// Start a session over `deck`, seeding statuses from `initial`.
    ///
    /// Cards missing from `initial` start `Unseen`. The cursor and reveal
    /// stage start at 0 and the filter is off.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyDeck` if the deck has no cards.
    pub fn initialize(
        deck: Deck,
        initial: &HashMap<CardId, MasteryStatus>,
    ) -> Result<Self, SessionError> {
        if deck.is_empty() {
            return Err(SessionError::EmptyDeck);
        }

        let clock = Clock::default_clock();
        let progress = ProgressMap::seeded(&deck, initial);
        let visible = (0..deck.len()).collect();

        Ok(Self {
            reveal: deck.kind().reveal_config(),
            deck,
            progress,
            only_unmastered: false,
            visible,
            cursor: 0,
            stage: RevealStage::initial(),
            last_direction: None,
            help_visible: false,
            last_revision: clock.revision_seed(),
            clock,
            issued_cards: HashMap::new(),
            issued_reset: None,
            effects: VecDeque::new(),
            pending_writes: 0,
            last_error: None,
        })
    }

    /// Use `clock` for write timestamps and reseed write revisions from it.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self.last_revision = clock.revision_seed();
        self
    }

    /// Keep every revision this session issues above `floor`, the highest
    /// revision the store already holds for the deck.
    #[must_use]
    pub fn with_revision_floor(mut self, floor: u64) -> Self {
        self.last_revision = self.last_revision.max(floor);
        self
    }

    #[must_use]
    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    #[must_use]
    pub fn reveal_config(&self) -> &RevealConfig {
        &self.reveal
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn reveal_stage(&self) -> RevealStage {
        self.stage
    }

    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    #[must_use]
    pub fn filter_enabled(&self) -> bool {
        self.only_unmastered
    }

    #[must_use]
    pub fn status(&self, id: CardId) -> MasteryStatus {
        self.progress.status(id)
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressMap {
        &self.progress
    }

    #[must_use]
    pub fn active_card(&self) -> Option<&Card> {
        self.visible
            .get(self.cursor)
            .and_then(|idx| self.deck.get(*idx))
    }

    fn active_card_id(&self) -> Option<CardId> {
        self.active_card().map(Card::id)
    }

    /// Requests handed to the worker whose outcome has not come back yet.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.pending_writes
    }

    /// Effects produced but not yet drained.
    #[must_use]
    pub fn queued_effects(&self) -> usize {
        self.effects.len()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&PersistenceFailure> {
        self.last_error.as_ref()
    }

    /// Apply one intent and report the resulting state.
    pub fn apply(&mut self, intent: SessionIntent) -> SessionSnapshot {
        self.reduce(intent);
        self.snapshot()
    }

    pub(crate) fn reduce(&mut self, intent: SessionIntent) {
        match intent {
            SessionIntent::Navigate(direction) => self.navigate(direction),
            SessionIntent::AdvanceReveal => {
                if self.active_card().is_some() {
                    self.stage = self.stage.advance(&self.reveal);
                }
            }
            SessionIntent::SetStatus(status) => self.set_active_status(status),
            SessionIntent::CycleStatus => {
                if let Some(id) = self.active_card_id() {
                    self.set_active_status(self.progress.status(id).cycled());
                }
            }
            SessionIntent::MasterDirectly => self.set_active_status(MasteryStatus::Mastered),
            SessionIntent::ResetCard => self.set_active_status(MasteryStatus::Unseen),
            SessionIntent::ResetAll => self.reset_all(),
            SessionIntent::SetFilter(only_unmastered) => self.set_filter(only_unmastered),
            SessionIntent::ToggleFilter => self.set_filter(!self.only_unmastered),
            SessionIntent::ShowHelp => self.help_visible = true,
            SessionIntent::HideHelp => self.help_visible = false,
        }
    }

    /// Take every queued effect; they count as pending until their outcome arrives.
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        let drained: Vec<Effect> = self.effects.drain(..).collect();
        self.pending_writes += drained.len();
        drained
    }

    /// Record a completed persistence request.
    ///
    /// A failure becomes the error channel's content; a success clears any
    /// failure that was issued before it. A write the store discarded counts
    /// as a failure when it was this session's newest for its scope, since the
    /// store then disagrees with what the learner sees. Statuses are never
    /// rolled back.
    pub fn apply_outcome(&mut self, outcome: WriteOutcome) {
        self.pending_writes = self.pending_writes.saturating_sub(1);
        match &outcome.result {
            Ok(ack) if !ack.applied && self.is_newest(outcome.revision, outcome.scope) => {
                warn!(
                    revision = outcome.revision,
                    scope = ?outcome.scope,
                    "store kept a newer revision, change not saved"
                );
                self.last_error = Some(PersistenceFailure::rejected(
                    outcome.revision,
                    outcome.scope,
                ));
            }
            Ok(ack) => {
                if !ack.applied {
                    debug!(revision = outcome.revision, "stale write discarded by store");
                }
                if self
                    .last_error
                    .as_ref()
                    .is_some_and(|failure| failure.revision < outcome.revision)
                {
                    self.last_error = None;
                }
            }
            Err(err) => {
                self.last_error = Some(PersistenceFailure::from_error(
                    outcome.revision,
                    outcome.scope,
                    err,
                ));
            }
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let active = self.active_card();
        SessionSnapshot {
            active_card: active.cloned(),
            status: active.map(|card| self.progress.status(card.id())),
            reveal_stage: self.stage,
            stage_face: active.map(|_| self.stage.face(&self.reveal)),
            reveal_action: active.map(|_| self.stage.next_action(&self.reveal)),
            is_back_face: active.is_some() && self.stage.is_back_face(&self.reveal),
            cursor: self.cursor,
            visible_count: self.visible.len(),
            deck_size: self.deck.len(),
            filter_enabled: self.only_unmastered,
            last_direction: self.last_direction,
            help_visible: self.help_visible,
            counts: self.progress.counts(),
            pending_writes: self.pending_writes,
            last_error: self.last_error.clone(),
        }
    }

    fn is_newest(&self, revision: u64, scope: WriteScope) -> bool {
        match scope {
            WriteScope::Card(card_id) => {
                self.issued_cards.get(&card_id) == Some(&revision)
                    && self.issued_reset.is_none_or(|reset| reset < revision)
            }
            WriteScope::AllCards => self.issued_reset == Some(revision),
        }
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────────
    //

    /// Moves with wraparound: past the last card is the first, and vice versa.
    fn navigate(&mut self, direction: NavigationDirection) {
        let len = self.visible.len();
        if len == 0 {
            return;
        }
        self.stage = RevealStage::initial();
        self.last_direction = Some(direction);
        self.cursor = match direction {
            NavigationDirection::Forward => (self.cursor + 1) % len,
            NavigationDirection::Backward => (self.cursor + len - 1) % len,
        };
    }

    fn set_active_status(&mut self, status: MasteryStatus) {
        let Some(card_id) = self.active_card_id() else {
            return;
        };
        self.progress.set(card_id, status);

        let revision = self.next_revision();
        self.issued_cards.insert(card_id, revision);
        self.effects.push_back(Effect::WriteStatus(StatusWrite {
            card_id,
            language_id: self.deck.language_id(),
            kind: self.deck.kind(),
            status,
            revision,
            requested_at: self.clock.now(),
        }));

        if self.only_unmastered {
            self.refresh_visible();
        }
    }

    /// Cursor and reveal stage are left exactly as they were.
    fn reset_all(&mut self) {
        self.progress.reset_all();

        let revision = self.next_revision();
        self.issued_reset = Some(revision);
        self.effects.push_back(Effect::BulkReset(BulkReset {
            language_id: self.deck.language_id(),
            kind: self.deck.kind(),
            revision,
            requested_at: self.clock.now(),
        }));

        // Resetting only ever grows the visible set, so the cursor stays in range.
        self.visible = self.compute_visible();
    }

    fn set_filter(&mut self, only_unmastered: bool) {
        if self.only_unmastered == only_unmastered {
            return;
        }
        self.only_unmastered = only_unmastered;
        self.refresh_visible();
    }

    /// Recompute the visible subsequence, keeping the active card under the
    /// cursor when it survives and clamping otherwise.
    fn refresh_visible(&mut self) {
        let previous = self.active_card_id();
        self.visible = self.compute_visible();

        if self.visible.is_empty() {
            self.cursor = 0;
        } else {
            let followed = previous.and_then(|id| {
                self.visible
                    .iter()
                    .position(|idx| self.deck.get(*idx).is_some_and(|card| card.id() == id))
            });
            self.cursor = followed.unwrap_or_else(|| self.cursor.min(self.visible.len() - 1));
        }

        if self.active_card_id() != previous {
            self.stage = RevealStage::initial();
        }
    }

    fn compute_visible(&self) -> Vec<usize> {
        self.deck
            .cards()
            .iter()
            .enumerate()
            .filter(|(_, card)| {
                !self.only_unmastered || !self.progress.status(card.id()).is_mastered()
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    fn next_revision(&mut self) -> u64 {
        self.last_revision += 1;
        self.last_revision
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
