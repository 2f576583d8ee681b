use serde::Serialize;
use thiserror::Error;

use crate::model::content::CardContent;
use crate::model::exercise::ExerciseKind;
use crate::model::ids::{CardId, LanguageId};

//
// ─── CARD VALIDATION ERRORS ────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CardError {
    #[error("card {0} has an empty word")]
    EmptyWord(CardId),

    #[error("card {0} has an empty riddle")]
    EmptyRiddle(CardId),
}

//
// ─── CARD ──────────────────────────────────────────────────────────────────────
//

/// One reviewable item: identity, owning language and payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    id: CardId,
    language_id: LanguageId,
    content: CardContent,
}

impl Card {
    /// # Errors
    ///
    /// Returns `CardError` if the headline text of the payload is blank.
    pub fn new(
        id: CardId,
        language_id: LanguageId,
        content: CardContent,
    ) -> Result<Self, CardError> {
        match &content {
            CardContent::Vocabulary { word, .. } if word.trim().is_empty() => {
                return Err(CardError::EmptyWord(id));
            }
            CardContent::Puzzle { riddle, .. } if riddle.trim().is_empty() => {
                return Err(CardError::EmptyRiddle(id));
            }
            _ => {}
        }

        Ok(Self {
            id,
            language_id,
            content,
        })
    }

    #[must_use]
    pub fn id(&self) -> CardId {
        self.id
    }

    #[must_use]
    pub fn language_id(&self) -> LanguageId {
        self.language_id
    }

    #[must_use]
    pub fn content(&self) -> &CardContent {
        &self.content
    }

    #[must_use]
    pub fn kind(&self) -> ExerciseKind {
        self.content.kind()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
