use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExerciseKindError {
    #[error("unknown exercise kind: {0}")]
    Unknown(String),
}

//
// ─── EXERCISE KIND ─────────────────────────────────────────────────────────────
//

/// The study track a deck belongs to.
///
/// All tracks share one status store; the kind keeps their progress apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseKind {
    Vocabulary,
    Puzzle,
    Image,
}

impl ExerciseKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vocabulary => "vocabulary",
            Self::Puzzle => "puzzle",
            Self::Image => "image",
        }
    }

    /// Parses the storage / configuration spelling of a kind.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseKindError::Unknown` for unrecognized names.
    pub fn parse(raw: &str) -> Result<Self, ExerciseKindError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "vocabulary" => Ok(Self::Vocabulary),
            "puzzle" => Ok(Self::Puzzle),
            "image" => Ok(Self::Image),
            other => Err(ExerciseKindError::Unknown(other.to_owned())),
        }
    }

    /// Reveal stages for cards of this kind.
    #[must_use]
    pub fn reveal_config(self) -> RevealConfig {
        const VOCABULARY: &[StageFace] =
            &[StageFace::Prompt, StageFace::Definition, StageFace::Translation];
        const PUZZLE: &[StageFace] = &[
            StageFace::Keywords,
            StageFace::Riddle,
            StageFace::Solution,
            StageFace::Translations,
        ];
        const IMAGE: &[StageFace] = &[StageFace::Picture, StageFace::Translations];

        let faces = match self {
            Self::Vocabulary => VOCABULARY,
            Self::Puzzle => PUZZLE,
            Self::Image => IMAGE,
        };
        RevealConfig { kind: self, faces }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── REVEAL CONFIGURATION ─────────────────────────────────────────────────────
//

/// What a reveal stage discloses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageFace {
    /// Word plus example sentences.
    Prompt,
    Definition,
    Translation,
    Keywords,
    Riddle,
    Solution,
    Picture,
    Translations,
}

/// What the reveal control does when pressed from the current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealAction {
    /// Disclose the next front-face stage.
    More,
    /// Turn the card to its back face.
    Flip,
    /// Return to stage 0.
    Collapse,
}

/// Stage layout for one exercise kind. The last face is the card's back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealConfig {
    kind: ExerciseKind,
    faces: &'static [StageFace],
}

impl RevealConfig {
    #[must_use]
    pub fn kind(&self) -> ExerciseKind {
        self.kind
    }

    #[must_use]
    pub fn stage_count(&self) -> u8 {
        u8::try_from(self.faces.len()).unwrap_or(u8::MAX)
    }

    fn last_index(&self) -> u8 {
        self.stage_count().saturating_sub(1)
    }
}

//
// ─── REVEAL STAGE ─────────────────────────────────────────────────────────────
//

/// How much of the active card is disclosed, `0..stage_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct RevealStage(u8);

impl RevealStage {
    #[must_use]
    pub fn initial() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn index(self) -> u8 {
        self.0
    }

    /// Moves to the next stage, wrapping to 0 after the back face.
    #[must_use]
    pub fn advance(self, config: &RevealConfig) -> Self {
        if self.0 < config.last_index() {
            Self(self.0 + 1)
        } else {
            Self(0)
        }
    }

    #[must_use]
    pub fn face(self, config: &RevealConfig) -> StageFace {
        let idx = usize::from(self.0.min(config.last_index()));
        config.faces[idx]
    }

    #[must_use]
    pub fn is_back_face(self, config: &RevealConfig) -> bool {
        self.0 == config.last_index()
    }

    #[must_use]
    pub fn next_action(self, config: &RevealConfig) -> RevealAction {
        let last = config.last_index();
        if self.0 >= last {
            RevealAction::Collapse
        } else if self.0 + 1 == last {
            RevealAction::Flip
        } else {
            RevealAction::More
        }
    }
}
