use std::path::Path;

use lingo_core::model::{Card, CardContent, CardId, Deck, ExerciseKind, LanguageId};
use serde::Deserialize;

use crate::AppError;

/// On-disk deck description.
///
/// ```json
/// { "language_id": 2, "kind": "vocabulary",
///   "cards": [{ "id": 1, "content": { "kind": "vocabulary", "word": "chat", ... } }] }
/// ```
#[derive(Debug, Deserialize)]
pub struct DeckFile {
    pub language_id: LanguageId,
    pub kind: ExerciseKind,
    pub cards: Vec<DeckFileCard>,
}

#[derive(Debug, Deserialize)]
pub struct DeckFileCard {
    pub id: CardId,
    pub content: CardContent,
}

impl DeckFile {
    pub fn read(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|source| AppError::DeckRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Validate every card and assemble the deck.
    pub fn into_deck(self) -> Result<Deck, AppError> {
        let language_id = self.language_id;
        let cards = self
            .cards
            .into_iter()
            .map(|entry| Card::new(entry.id, language_id, entry.content))
            .collect::<Result<Vec<_>, _>>()
            .map_err(lingo_core::Error::from)?;
        let deck = Deck::new(language_id, self.kind, cards).map_err(lingo_core::Error::from)?;
        Ok(deck)
    }
}
