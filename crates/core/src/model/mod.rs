mod card;
pub mod content;
mod deck;
mod exercise;
mod ids;
mod progress;
mod status;

pub use content::{
    CardContent, ImageTranslation, MediaUri, MediaValidationError, PuzzleTranslation,
};
pub use ids::{CardId, LanguageId, ParseIdError};

pub use card::{Card, CardError};
pub use deck::{Deck, DeckError};
pub use exercise::{
    ExerciseKind, ExerciseKindError, RevealAction, RevealConfig, RevealStage, StageFace,
};
pub use progress::{ProgressCounts, ProgressMap};
pub use status::{MasteryStatus, StatusError};
