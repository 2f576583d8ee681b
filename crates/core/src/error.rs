use thiserror::Error;

use crate::model::{CardError, DeckError, ExerciseKindError, MediaValidationError, StatusError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Card(#[from] CardError),
    #[error(transparent)]
    Deck(#[from] DeckError),
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error(transparent)]
    ExerciseKind(#[from] ExerciseKindError),
    #[error(transparent)]
    MediaValidation(#[from] MediaValidationError),
}
