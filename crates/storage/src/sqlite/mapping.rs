use lingo_core::model::{CardId, ExerciseKind, LanguageId, MasteryStatus};
use sqlx::Row;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn card_id_to_i64(id: CardId) -> Result<i64, StorageError> {
    u64_to_i64("card_id", id.value())
}

pub(crate) fn language_id_to_i64(id: LanguageId) -> Result<i64, StorageError> {
    u64_to_i64("language_id", id.value())
}

pub(crate) fn revision_to_i64(revision: u64) -> Result<i64, StorageError> {
    u64_to_i64("revision", revision)
}

pub(crate) fn revision_from_i64(v: i64) -> Result<u64, StorageError> {
    i64_to_u64("revision", v)
}

pub(crate) fn card_id_from_i64(v: i64) -> Result<CardId, StorageError> {
    Ok(CardId::new(i64_to_u64("card_id", v)?))
}

/// Stored encoding is the ordinal: Unseen=0, Learning=1, Mastered=2.
pub(crate) fn status_to_i64(status: MasteryStatus) -> i64 {
    i64::from(status.as_u8())
}

pub(crate) fn status_from_i64(value: i64) -> Result<MasteryStatus, StorageError> {
    let raw = u8::try_from(value)
        .map_err(|_| StorageError::Serialization(format!("invalid status: {value}")))?;
    MasteryStatus::from_u8(raw).map_err(ser)
}

pub(crate) fn kind_to_str(kind: ExerciseKind) -> &'static str {
    kind.as_str()
}

pub(crate) fn map_status_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<(CardId, MasteryStatus), StorageError> {
    let card_id = card_id_from_i64(row.try_get::<i64, _>("card_id").map_err(ser)?)?;
    let status = status_from_i64(row.try_get::<i64, _>("status").map_err(ser)?)?;
    Ok((card_id, status))
}
