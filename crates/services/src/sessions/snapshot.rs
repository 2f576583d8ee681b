use lingo_core::model::{
    Card, MasteryStatus, ProgressCounts, RevealAction, RevealStage, StageFace,
};

use serde::Serialize;

use super::effects::PersistenceFailure;
use super::intent::NavigationDirection;

/// Everything the presentation needs to render a review session.
///
/// Presentation-agnostic: no formatted strings, no localization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// `None` when the filter hides every card.
    pub active_card: Option<Card>,
    pub status: Option<MasteryStatus>,
    pub reveal_stage: RevealStage,
    pub stage_face: Option<StageFace>,
    pub reveal_action: Option<RevealAction>,
    pub is_back_face: bool,
    /// Index into the visible subsequence, not the deck.
    pub cursor: usize,
    pub visible_count: usize,
    pub deck_size: usize,
    pub filter_enabled: bool,
    pub last_direction: Option<NavigationDirection>,
    pub help_visible: bool,
    pub counts: ProgressCounts,
    pub pending_writes: usize,
    /// Error channel: the most recent unresolved persistence failure.
    pub last_error: Option<PersistenceFailure>,
}

impl SessionSnapshot {
    /// One-based `(position, of)` for headers like "Card 2/5".
    #[must_use]
    pub fn position(&self) -> Option<(usize, usize)> {
        self.active_card
            .as_ref()
            .map(|_| (self.cursor + 1, self.visible_count))
    }

    #[must_use]
    pub fn has_card(&self) -> bool {
        self.active_card.is_some()
    }
}

#[cfg(test)]
mod tests {
    use crate::sessions::{ReviewSession, SessionIntent};
    use lingo_core::model::{Card, CardContent, CardId, Deck, ExerciseKind, LanguageId};
    use std::collections::HashMap;

    #[test]
    fn snapshot_serializes_for_external_drivers() {
        let card = Card::new(
            CardId::new(9),
            LanguageId::new(1),
            CardContent::Vocabulary {
                word: "gato".into(),
                examples: vec![],
                definition: "cat".into(),
                translation: "cat".into(),
            },
        )
        .unwrap();
        let deck = Deck::new(LanguageId::new(1), ExerciseKind::Vocabulary, vec![card]).unwrap();
        let mut session = ReviewSession::initialize(deck, &HashMap::new()).unwrap();
        let snapshot = session.apply(SessionIntent::AdvanceReveal);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["reveal_stage"], 1);
        assert_eq!(json["stage_face"], "definition");
        assert_eq!(json["reveal_action"], "flip");
        assert_eq!(json["status"], 0);
        assert_eq!(json["active_card"]["id"], 9);
        assert_eq!(json["counts"]["unseen"], 1);
        assert!(json["last_error"].is_null());
    }
}
