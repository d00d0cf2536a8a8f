use chrono::{DateTime, Utc};
use quiz_core::model::{QuestionId, QuizId, RawRecord};
use serde_json::Map;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{body_to_json, conn, map_record_row, map_summary_row, ser};
use crate::repository::{QuestionSource, QuestionStore, QuizSummary, StorageError};

#[async_trait::async_trait]
impl QuestionSource for SqliteRepository {
    async fn fetch_questions(&self, quiz_id: &QuizId) -> Result<Vec<RawRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, body
            FROM quiz_questions
            WHERE quiz_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(quiz_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(decode_row(row, quiz_id)?);
        }
        Ok(records)
    }

    async fn fetch_question(
        &self,
        quiz_id: &QuizId,
        question_id: &QuestionId,
    ) -> Result<Option<RawRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, body
            FROM quiz_questions
            WHERE quiz_id = ?1 AND id = ?2
            ",
        )
        .bind(quiz_id.as_str())
        .bind(question_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(|row| decode_row(row, quiz_id)).transpose()
    }
}

/// A body that no longer decodes to a document is handed on with no fields so
/// normalization rejects it like any other unusable record.
fn decode_row(row: &SqliteRow, quiz_id: &QuizId) -> Result<RawRecord, StorageError> {
    match map_record_row(row) {
        Ok(record) => Ok(record),
        Err(err @ StorageError::Serialization(_)) => {
            let id: String = row.try_get("id").map_err(ser)?;
            log::warn!("question {id} in quiz {quiz_id} has an undecodable body: {err}");
            Ok(RawRecord::new(id, Map::new()))
        }
        Err(err) => Err(err),
    }
}
