use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::model::exercise::ExerciseKind;
use crate::model::ids::LanguageId;

//
// ─── ERRORS (domain validation) ────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaValidationError {
    #[error("Media URI cannot be empty.")]
    EmptyMediaUri,

    #[error("Media URL is malformed: {0}")]
    MalformedUrl(String),
}

//
// ─── MEDIA REFERENCE ───────────────────────────────────────────────────────────
//

/// Where an image card's picture lives. Hosting is somebody else's problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MediaUri {
    FilePath(PathBuf),
    Url(Url),
}

impl MediaUri {
    /// # Errors
    ///
    /// Returns `MediaValidationError::EmptyMediaUri` for an empty path.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, MediaValidationError> {
        let p = path.into();
        if p.as_os_str().is_empty() {
            return Err(MediaValidationError::EmptyMediaUri);
        }
        Ok(MediaUri::FilePath(p))
    }

    /// # Errors
    ///
    /// Returns `MediaValidationError` if the input is blank or not a URL.
    pub fn from_url(url: impl AsRef<str>) -> Result<Self, MediaValidationError> {
        let s = url.as_ref().trim();
        if s.is_empty() {
            return Err(MediaValidationError::EmptyMediaUri);
        }
        let u = Url::parse(s).map_err(|e| MediaValidationError::MalformedUrl(e.to_string()))?;
        Ok(MediaUri::Url(u))
    }

    /// Accepts either a URL with a scheme or a filesystem path.
    ///
    /// # Errors
    ///
    /// Returns `MediaValidationError` if the input is blank or a malformed URL.
    pub fn parse(raw: &str) -> Result<Self, MediaValidationError> {
        let trimmed = raw.trim();
        if trimmed.contains("://") {
            Self::from_url(trimmed)
        } else {
            Self::from_file(trimmed)
        }
    }

    #[must_use]
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            MediaUri::FilePath(p) => Some(p.as_path()),
            MediaUri::Url(_) => None,
        }
    }

    #[must_use]
    pub fn as_url(&self) -> Option<&Url> {
        match self {
            MediaUri::Url(u) => Some(u),
            MediaUri::FilePath(_) => None,
        }
    }
}

impl TryFrom<String> for MediaUri {
    type Error = MediaValidationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<MediaUri> for String {
    fn from(uri: MediaUri) -> Self {
        match uri {
            MediaUri::FilePath(p) => p.display().to_string(),
            MediaUri::Url(u) => u.into(),
        }
    }
}

//
// ─── CARD PAYLOADS ─────────────────────────────────────────────────────────────
//

/// A puzzle rendered in another language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleTranslation {
    pub language_id: LanguageId,
    pub riddle: String,
    pub solution: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageTranslation {
    pub language_id: LanguageId,
    pub text: String,
}

/// What a card shows. The review engine only ever asks for `kind()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CardContent {
    Vocabulary {
        word: String,
        #[serde(default)]
        examples: Vec<String>,
        definition: String,
        translation: String,
    },
    Puzzle {
        #[serde(default)]
        keywords: Vec<String>,
        riddle: String,
        solution: String,
        #[serde(default)]
        translations: Vec<PuzzleTranslation>,
    },
    Image {
        image: MediaUri,
        #[serde(default)]
        translations: Vec<ImageTranslation>,
    },
}

impl CardContent {
    #[must_use]
    pub fn kind(&self) -> ExerciseKind {
        match self {
            Self::Vocabulary { .. } => ExerciseKind::Vocabulary,
            Self::Puzzle { .. } => ExerciseKind::Puzzle,
            Self::Image { .. } => ExerciseKind::Image,
        }
    }

    /// Short label for logs and list views: the word, the riddle, or the image location.
    #[must_use]
    pub fn headline(&self) -> String {
        match self {
            Self::Vocabulary { word, .. } => word.clone(),
            Self::Puzzle { riddle, .. } => riddle.clone(),
            Self::Image { image, .. } => String::from(image.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_uri_parses_urls_and_paths() {
        let url = MediaUri::parse("https://cdn.example.org/carrot.png").unwrap();
        assert!(url.as_url().is_some());
        let path = MediaUri::parse("images/carrot.png").unwrap();
        assert_eq!(path.as_path(), Some(Path::new("images/carrot.png")));
        assert!(matches!(
            MediaUri::parse("   "),
            Err(MediaValidationError::EmptyMediaUri)
        ));
    }

    #[test]
    fn content_deserializes_by_kind_tag() {
        let json = r#"{
            "kind": "puzzle",
            "keywords": ["sol", "día"],
            "riddle": "Sale por la mañana",
            "solution": "el sol"
        }"#;
        let content: CardContent = serde_json::from_str(json).unwrap();
        assert_eq!(content.kind(), ExerciseKind::Puzzle);
        assert_eq!(content.headline(), "Sale por la mañana");
    }

    #[test]
    fn image_content_round_trips_uri_as_string() {
        let content = CardContent::Image {
            image: MediaUri::parse("https://cdn.example.org/leek.png").unwrap(),
            translations: vec![ImageTranslation {
                language_id: LanguageId::new(2),
                text: "leek".into(),
            }],
        };
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["image"], "https://cdn.example.org/leek.png");
        assert_eq!(json["kind"], "image");
    }
}
