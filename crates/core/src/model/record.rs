use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RecordError {
    #[error("question document must be a JSON object")]
    NotAnObject,

    #[error("question document is missing a string or numeric `id`")]
    MissingId,
}

/// A stored question document before normalization.
///
/// Field names and shapes vary between authoring tools, so the body is kept
/// as a generic JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    id: String,
    fields: Map<String, Value>,
}

impl RawRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Build a record from a document carrying its own `id` field.
    ///
    /// The `id` key is removed from the stored fields.
    ///
    /// # Errors
    ///
    /// Returns `RecordError` if the value is not an object or has no usable id.
    pub fn from_document(doc: Value) -> Result<Self, RecordError> {
        let Value::Object(mut fields) = doc else {
            return Err(RecordError::NotAnObject);
        };
        let id = match fields.remove("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(RecordError::MissingId),
        };
        Ok(Self { id, fields })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Non-blank string value of a field.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_document_extracts_id() {
        let record =
            RawRecord::from_document(json!({ "id": "q1", "questionText": "Why?" })).unwrap();
        assert_eq!(record.id(), "q1");
        assert!(record.get("id").is_none());
        assert_eq!(record.get_str("questionText"), Some("Why?"));
    }

    #[test]
    fn numeric_ids_are_accepted() {
        let record = RawRecord::from_document(json!({ "id": 7 })).unwrap();
        assert_eq!(record.id(), "7");
    }

    #[test]
    fn rejects_non_objects_and_missing_ids() {
        assert_eq!(
            RawRecord::from_document(json!(["q"])).unwrap_err(),
            RecordError::NotAnObject
        );
        assert_eq!(
            RawRecord::from_document(json!({ "id": "" })).unwrap_err(),
            RecordError::MissingId
        );
    }
}
