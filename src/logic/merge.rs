use serde_json::{Map, Value};
use validator::Validate;

use crate::logic::validate::FieldErrors;
use crate::model::{now_rfc3339, Document, UserContext};

/// Shallow merge of submitted top-level fields over a stored document.
///
/// Nested objects such as `metadata` are replaced wholesale when present in
/// `updates`. The identity fields `id` and `partitionKey` always keep their
/// stored values. The result must still be a valid document.
pub fn merge_document(existing: &Document, updates: Map<String, Value>) -> Result<Document, FieldErrors> {
    let mut merged = match serde_json::to_value(existing)? {
        Value::Object(map) => map,
        _ => return Err(FieldErrors::form("Stored document is not an object")),
    };

    for (key, value) in updates {
        merged.insert(key, value);
    }
    merged.insert("id".to_string(), Value::String(existing.id.clone()));
    merged.insert(
        "partitionKey".to_string(),
        Value::String(existing.partition_key.clone()),
    );

    let document: Document = serde_json::from_value(Value::Object(merged))?;
    document.validate()?;
    Ok(document)
}

/// Stamp a successful write: bump the version past the stored one and record
/// who changed the document and when
pub fn stamp_revision(document: &mut Document, stored_version: i64, user: &UserContext) {
    document.metadata.version = stored_version + 1;
    document.metadata.modified_by = Some(user.user_id.clone());
    document.metadata.modified_at = Some(now_rfc3339());
}

/// Version the client claims to have read, if it sent one
pub fn expected_version(updates: &Map<String, Value>) -> Option<i64> {
    updates
        .get("metadata")
        .and_then(|metadata| metadata.get("version"))
        .and_then(Value::as_i64)
}
