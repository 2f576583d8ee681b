use std::collections::HashMap;

use lingo_core::model::{CardId, ExerciseKind, LanguageId, MasteryStatus};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    card_id_to_i64, kind_to_str, language_id_to_i64, map_status_row, revision_from_i64,
    revision_to_i64, status_to_i64,
};
use crate::repository::{BulkReset, ProgressRepository, StatusWrite, StorageError, WriteAck};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_statuses(
        &self,
        language_id: LanguageId,
        kind: ExerciseKind,
    ) -> Result<HashMap<CardId, MasteryStatus>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT card_id, status
            FROM card_progress
            WHERE language_id = ?1 AND kind = ?2
            ",
        )
        .bind(language_id_to_i64(language_id)?)
        .bind(kind_to_str(kind))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = HashMap::with_capacity(rows.len());
        for row in rows {
            let (card_id, status) = map_status_row(&row)?;
            out.insert(card_id, status);
        }
        Ok(out)
    }

    async fn revision_floor(
        &self,
        language_id: LanguageId,
        kind: ExerciseKind,
    ) -> Result<u64, StorageError> {
        let row = sqlx::query(
            r"
            SELECT MAX(revision) AS floor FROM (
                SELECT revision FROM card_progress WHERE language_id = ?1 AND kind = ?2
                UNION ALL
                SELECT revision FROM progress_resets WHERE language_id = ?1 AND kind = ?2
            )
            ",
        )
        .bind(language_id_to_i64(language_id)?)
        .bind(kind_to_str(kind))
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        revision_from_i64(row.try_get::<Option<i64>, _>("floor").map_err(conn)?.unwrap_or(0))
    }

    async fn write_status(&self, write: &StatusWrite) -> Result<WriteAck, StorageError> {
        // One statement: fenced by the scope's reset watermark, then by the
        // card's own stored revision.
        let result = sqlx::query(
            r"
            INSERT INTO card_progress (card_id, language_id, kind, status, revision, updated_at)
            SELECT ?1, ?2, ?3, ?4, ?5, ?6
            WHERE ?5 > COALESCE(
                (SELECT revision FROM progress_resets WHERE language_id = ?2 AND kind = ?3),
                -1
            )
            ON CONFLICT(card_id, language_id, kind) DO UPDATE SET
                status = excluded.status,
                revision = excluded.revision,
                updated_at = excluded.updated_at
            WHERE excluded.revision > card_progress.revision
            ",
        )
        .bind(card_id_to_i64(write.card_id)?)
        .bind(language_id_to_i64(write.language_id)?)
        .bind(kind_to_str(write.kind))
        .bind(status_to_i64(write.status))
        .bind(revision_to_i64(write.revision)?)
        .bind(write.requested_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(WriteAck {
            applied: result.rows_affected() > 0,
        })
    }

    async fn write_bulk_reset(&self, reset: &BulkReset) -> Result<WriteAck, StorageError> {
        let language = language_id_to_i64(reset.language_id)?;
        let revision = revision_to_i64(reset.revision)?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let watermark = sqlx::query(
            r"
            INSERT INTO progress_resets (language_id, kind, revision, reset_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(language_id, kind) DO UPDATE SET
                revision = excluded.revision,
                reset_at = excluded.reset_at
            WHERE excluded.revision > progress_resets.revision
            ",
        )
        .bind(language)
        .bind(kind_to_str(reset.kind))
        .bind(revision)
        .bind(reset.requested_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        if watermark.rows_affected() == 0 {
            tx.rollback().await.map_err(conn)?;
            return Ok(WriteAck::discarded());
        }

        sqlx::query(
            r"
            UPDATE card_progress
            SET status = ?4, revision = ?3, updated_at = ?5
            WHERE language_id = ?1 AND kind = ?2 AND revision < ?3
            ",
        )
        .bind(language)
        .bind(kind_to_str(reset.kind))
        .bind(revision)
        .bind(status_to_i64(MasteryStatus::Unseen))
        .bind(reset.requested_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;
        Ok(WriteAck::applied())
    }
}
