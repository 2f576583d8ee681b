use std::collections::HashMap;

use serde::Serialize;

use crate::model::deck::Deck;
use crate::model::ids::CardId;
use crate::model::status::MasteryStatus;

/// Per-status tallies, handy for headers like "3 mastered / 12".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressCounts {
    pub unseen: usize,
    pub learning: usize,
    pub mastered: usize,
}

impl ProgressCounts {
    #[must_use]
    pub fn total(&self) -> usize {
        self.unseen + self.learning + self.mastered
    }
}

/// In-memory status of every card in a session's deck.
///
/// Always holds exactly one entry per deck card.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressMap {
    statuses: HashMap<CardId, MasteryStatus>,
}

impl ProgressMap {
    /// Every deck card starts `Unseen`, then supplied statuses are laid on top.
    /// Statuses for ids outside the deck are dropped.
    #[must_use]
    pub fn seeded(deck: &Deck, initial: &HashMap<CardId, MasteryStatus>) -> Self {
        let statuses = deck
            .card_ids()
            .map(|id| (id, initial.get(&id).copied().unwrap_or_default()))
            .collect();
        Self { statuses }
    }

    #[must_use]
    pub fn status(&self, id: CardId) -> MasteryStatus {
        self.statuses.get(&id).copied().unwrap_or_default()
    }

    /// Records a status for a known card. Unknown ids are ignored and reported as `false`.
    pub fn set(&mut self, id: CardId, status: MasteryStatus) -> bool {
        match self.statuses.get_mut(&id) {
            Some(slot) => {
                *slot = status;
                true
            }
            None => false,
        }
    }

    pub fn reset_all(&mut self) {
        for status in self.statuses.values_mut() {
            *status = MasteryStatus::Unseen;
        }
    }

    #[must_use]
    pub fn counts(&self) -> ProgressCounts {
        let mut counts = ProgressCounts::default();
        for status in self.statuses.values() {
            match status {
                MasteryStatus::Unseen => counts.unseen += 1,
                MasteryStatus::Learning => counts.learning += 1,
                MasteryStatus::Mastered => counts.mastered += 1,
            }
        }
        counts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}
