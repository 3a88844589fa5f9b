use axum::{body::Bytes, extract::State, response::Json};

use crate::api::error::ApiError;
use crate::api::handlers::AppState;
use crate::model::{DirectoryCacheEntry, OrganizationId, SyncRequest, SyncResponse};
use crate::store::Store;

/// Merge a caller-supplied batch of directory users into the cache.
///
/// The batch is applied atomically. On failure nothing is written and the
/// client gets a generic 500; the cause only goes to the log.
pub async fn sync_directory_users<S: Store>(
    State(state): State<AppState<S>>,
    org: OrganizationId,
    body: Bytes,
) -> Result<Json<SyncResponse>, ApiError> {
    let request = match SyncRequest::from_body(&body) {
        Ok(request) => request,
        Err(e) => {
            log::error!("Directory sync for organization {} rejected: {:#}", org, e);
            return Err(ApiError::SyncFailed);
        }
    };

    match state
        .store
        .sync_directory_users(org, &request.users)
        .await
    {
        Ok(updated) => {
            log::info!(
                "Synchronized {} directory users for organization {}",
                updated,
                org
            );
            Ok(Json(SyncResponse { updated }))
        }
        Err(e) => {
            log::error!(
                "Directory sync for organization {} rolled back: {:#}",
                org,
                e
            );
            Err(ApiError::SyncFailed)
        }
    }
}

pub async fn list_directory_users<S: Store>(
    State(state): State<AppState<S>>,
    org: OrganizationId,
) -> Result<Json<Vec<DirectoryCacheEntry>>, ApiError> {
    Ok(Json(state.store.list_directory_users(org).await?))
}
