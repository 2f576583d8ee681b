use std::collections::HashSet;

use thiserror::Error;

use crate::model::card::Card;
use crate::model::exercise::ExerciseKind;
use crate::model::ids::{CardId, LanguageId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeckError {
    #[error("card {0} appears more than once in the deck")]
    DuplicateCard(CardId),

    #[error("card {card} is a {found} card but the deck is {expected}")]
    KindMismatch {
        card: CardId,
        expected: ExerciseKind,
        found: ExerciseKind,
    },
}

//
// ─── DECK ──────────────────────────────────────────────────────────────────────
//

/// Ordered cards loaded for one review session.
///
/// Immutable once built; re-fetching produces a new deck and a new session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    language_id: LanguageId,
    kind: ExerciseKind,
    cards: Vec<Card>,
}

impl Deck {
    /// Builds a deck, enforcing unique card ids and a single exercise kind.
    ///
    /// An empty deck is allowed here; starting a session on it is not.
    ///
    /// # Errors
    ///
    /// Returns `DeckError::DuplicateCard` or `DeckError::KindMismatch`.
    pub fn new(
        language_id: LanguageId,
        kind: ExerciseKind,
        cards: Vec<Card>,
    ) -> Result<Self, DeckError> {
        let mut seen = HashSet::with_capacity(cards.len());
        for card in &cards {
            if !seen.insert(card.id()) {
                return Err(DeckError::DuplicateCard(card.id()));
            }
            if card.kind() != kind {
                return Err(DeckError::KindMismatch {
                    card: card.id(),
                    expected: kind,
                    found: card.kind(),
                });
            }
        }

        Ok(Self {
            language_id,
            kind,
            cards,
        })
    }

    #[must_use]
    pub fn language_id(&self) -> LanguageId {
        self.language_id
    }

    #[must_use]
    pub fn kind(&self) -> ExerciseKind {
        self.kind
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    #[must_use]
    pub fn position_of(&self, id: CardId) -> Option<usize> {
        self.cards.iter().position(|card| card.id() == id)
    }

    pub fn card_ids(&self) -> impl Iterator<Item = CardId> + '_ {
        self.cards.iter().map(Card::id)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::content::{CardContent, ImageTranslation, MediaUri};

    fn word_card(id: u64) -> Card {
        Card::new(
            CardId::new(id),
            LanguageId::new(1),
            CardContent::Vocabulary {
                word: format!("word-{id}"),
                examples: vec![],
                definition: "def".into(),
                translation: "tr".into(),
            },
        )
        .unwrap()
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Deck::new(
            LanguageId::new(1),
            ExerciseKind::Vocabulary,
            vec![word_card(1), word_card(2), word_card(1)],
        )
        .unwrap_err();
        assert_eq!(err, DeckError::DuplicateCard(CardId::new(1)));
    }

    #[test]
    fn rejects_mixed_kinds() {
        let image = Card::new(
            CardId::new(5),
            LanguageId::new(1),
            CardContent::Image {
                image: MediaUri::parse("carrot.png").unwrap(),
                translations: vec![ImageTranslation {
                    language_id: LanguageId::new(2),
                    text: "carrot".into(),
                }],
            },
        )
        .unwrap();

        let err = Deck::new(
            LanguageId::new(1),
            ExerciseKind::Vocabulary,
            vec![word_card(1), image],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DeckError::KindMismatch {
                found: ExerciseKind::Image,
                ..
            }
        ));
    }

    #[test]
    fn keeps_order_and_finds_positions() {
        let deck = Deck::new(
            LanguageId::new(1),
            ExerciseKind::Vocabulary,
            vec![word_card(3), word_card(1), word_card(2)],
        )
        .unwrap();
        assert_eq!(deck.len(), 3);
        assert_eq!(deck.position_of(CardId::new(1)), Some(1));
        assert_eq!(deck.position_of(CardId::new(9)), None);
        let ids: Vec<u64> = deck.card_ids().map(|id| id.value()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn empty_deck_is_constructible() {
        let deck = Deck::new(LanguageId::new(1), ExerciseKind::Puzzle, Vec::new()).unwrap();
        assert!(deck.is_empty());
    }
}
