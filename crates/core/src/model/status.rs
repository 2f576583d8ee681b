use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatusError {
    #[error("invalid mastery status value: {0}")]
    InvalidStatus(u8),
}

//
// ─── MASTERY STATUS ───────────────────────────────────────────────────────────
//

/// Learning progress recorded for a single card.
///
/// The ordinal is what gets persisted: `Unseen=0`, `Learning=1`, `Mastered=2`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum MasteryStatus {
    /// Never marked by the learner.
    #[default]
    Unseen,
    /// Seen and still being practised.
    Learning,
    /// Known; hidden when the session filter only shows unmastered cards.
    Mastered,
}

impl MasteryStatus {
    /// Converts the persisted ordinal into a status.
    ///
    /// # Errors
    ///
    /// Returns `StatusError::InvalidStatus` for anything above 2.
    pub fn from_u8(value: u8) -> Result<Self, StatusError> {
        match value {
            0 => Ok(Self::Unseen),
            1 => Ok(Self::Learning),
            2 => Ok(Self::Mastered),
            _ => Err(StatusError::InvalidStatus(value)),
        }
    }

    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Unseen => 0,
            Self::Learning => 1,
            Self::Mastered => 2,
        }
    }

    #[must_use]
    pub fn is_mastered(self) -> bool {
        matches!(self, Self::Mastered)
    }

    /// Next status for the single-step "check" action.
    ///
    /// Steps forward along Unseen → Learning → Mastered and drops a mastered
    /// card back to Learning. Never yields `Unseen`; only an explicit reset does.
    #[must_use]
    pub fn cycled(self) -> Self {
        match self {
            Self::Unseen | Self::Mastered => Self::Learning,
            Self::Learning => Self::Mastered,
        }
    }
}

impl TryFrom<u8> for MasteryStatus {
    type Error = StatusError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value)
    }
}

impl From<MasteryStatus> for u8 {
    fn from(status: MasteryStatus) -> Self {
        status.as_u8()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_conversion_rejects_out_of_range() {
        assert_eq!(MasteryStatus::from_u8(0).unwrap(), MasteryStatus::Unseen);
        assert_eq!(MasteryStatus::from_u8(2).unwrap(), MasteryStatus::Mastered);
        let err = MasteryStatus::from_u8(3).unwrap_err();
        assert!(matches!(err, StatusError::InvalidStatus(3)));
    }

    #[test]
    fn cycle_never_returns_to_unseen() {
        let mut status = MasteryStatus::Mastered;
        let mut seen = Vec::new();
        for _ in 0..3 {
            status = status.cycled();
            seen.push(status);
        }
        assert_eq!(
            seen,
            vec![
                MasteryStatus::Learning,
                MasteryStatus::Mastered,
                MasteryStatus::Learning
            ]
        );
        assert_eq!(MasteryStatus::Unseen.cycled(), MasteryStatus::Learning);
    }

    #[test]
    fn serializes_as_ordinal() {
        assert_eq!(serde_json::to_string(&MasteryStatus::Learning).unwrap(), "1");
        let parsed: MasteryStatus = serde_json::from_str("2").unwrap();
        assert_eq!(parsed, MasteryStatus::Mastered);
        assert!(serde_json::from_str::<MasteryStatus>("9").is_err());
    }
}
