use quiz_core::model::RawRecord;
use serde_json::Value;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{QuizSummary, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Serialize a record body (everything but the id) for the `body` column.
pub(crate) fn body_to_json(record: &RawRecord) -> Result<String, StorageError> {
    serde_json::to_string(record.fields()).map_err(ser)
}

pub(crate) fn map_record_row(row: &SqliteRow) -> Result<RawRecord, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let body: String = row.try_get("body").map_err(ser)?;
    match serde_json::from_str::<Value>(&body).map_err(ser)? {
        Value::Object(fields) => Ok(RawRecord::new(id, fields)),
        other => Err(StorageError::Serialization(format!(
            "record {id} body is not an object: {other}"
        ))),
    }
}

pub(crate) fn map_summary_row(row: &SqliteRow) -> Result<QuizSummary, StorageError> {
    let quiz_id: String = row.try_get("quiz_id").map_err(ser)?;
    let count: i64 = row.try_get("question_count").map_err(ser)?;
    Ok(QuizSummary {
        quiz_id: quiz_id.parse().map_err(ser)?,
        question_count: u32::try_from(count)
            .map_err(|_| StorageError::Serialization(format!("invalid question_count: {count}")))?,
    })
}
