use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::api::error::ApiError;
use crate::api::handlers::AppState;
use crate::api::validation::{JsonObject, ValidatedJson};
use crate::logic::{expected_version, merge_document, stamp_revision};
use crate::model::{Document, DocumentFilter, Id, NewDocument, UserContext};
use crate::store::Store;

#[derive(Debug, Deserialize)]
pub struct PartitionQuery {
    pub pk: Option<String>,
}

fn require_partition_key(pk: Option<String>) -> Result<String, ApiError> {
    pk.filter(|pk| !pk.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing partition key".to_string()))
}

pub async fn list_documents<S: Store>(
    State(state): State<AppState<S>>,
    Query(filter): Query<DocumentFilter>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let documents = state.store.list_documents(&filter).await?;
    Ok(Json(documents))
}

pub async fn get_document<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    Query(query): Query<PartitionQuery>,
) -> Result<Json<Document>, ApiError> {
    let pk = require_partition_key(query.pk)?;
    state
        .store
        .get_document(&id, &pk)
        .await?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

pub async fn create_document<S: Store>(
    State(state): State<AppState<S>>,
    ValidatedJson(new_document): ValidatedJson<NewDocument>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let document = state
        .store
        .create_document(new_document.into_document())
        .await?;
    log::info!(
        "Created document {} in partition {}",
        document.id,
        document.partition_key
    );
    Ok((StatusCode::CREATED, Json(document)))
}

/// Read-merge-write. The partition key comes from the body (`partitionKey`)
/// or the `pk` query parameter. A `metadata.version` in the body must match
/// the stored version, and the write only lands if nobody else wrote since
/// the read.
pub async fn update_document<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    Query(query): Query<PartitionQuery>,
    user: UserContext,
    JsonObject(updates): JsonObject,
) -> Result<Json<Document>, ApiError> {
    let pk = updates
        .get("partitionKey")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or(query.pk);
    let pk = require_partition_key(pk)?;

    let existing = state
        .store
        .get_document(&id, &pk)
        .await?
        .ok_or_else(ApiError::not_found)?;

    if existing.is_locked_against(&user.user_id) {
        return Err(ApiError::Locked(format!(
            "Document is locked by {}",
            existing.metadata.locked_by.as_deref().unwrap_or("another user")
        )));
    }

    let stored_version = existing.metadata.version;
    if let Some(expected) = expected_version(&updates) {
        if expected != stored_version {
            return Err(ApiError::Conflict(format!(
                "Version mismatch: expected {}, stored {}",
                expected, stored_version
            )));
        }
    }

    let mut merged = merge_document(&existing, updates)?;
    stamp_revision(&mut merged, stored_version, &user);

    let updated = state
        .store
        .replace_document(merged, stored_version)
        .await?
        .ok_or_else(|| ApiError::Conflict("Document was modified concurrently".to_string()))?;
    log::info!(
        "Updated document {} to version {}",
        updated.id,
        updated.metadata.version
    );
    Ok(Json(updated))
}

/// Always 204, whether or not the document existed
pub async fn delete_document<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    Query(query): Query<PartitionQuery>,
) -> Result<StatusCode, ApiError> {
    let pk = require_partition_key(query.pk)?;
    if !state.store.delete_document(&id, &pk).await? {
        log::debug!("Delete of missing document {} in partition {}", id, pk);
    }
    Ok(StatusCode::NO_CONTENT)
}
