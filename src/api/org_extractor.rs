use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::handlers::AppState;
use crate::api::user_extractor::extract_header_value;
use crate::model::OrganizationId;
use crate::store::Store;

pub const ORGANIZATION_HEADER: &str = "x-organization-id";

/// Resolves the organization a request works on: the `X-Organization-Id`
/// header when present, otherwise the deployment's default organization.
/// A named organization must exist.
#[async_trait]
impl<S> FromRequestParts<AppState<S>> for OrganizationId
where
    S: Store + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(value) = extract_header_value(&parts.headers, ORGANIZATION_HEADER) {
            let org = parse_organization_id(&value)?;
            if !state.store.organization_exists(org).await? {
                return Err(ApiError::NotFound(format!("Organization {} not found", org)));
            }
            return Ok(org);
        }

        state
            .store
            .default_organization_id()
            .await?
            .ok_or_else(|| ApiError::NotFound("No organization configured".to_string()))
    }
}

fn parse_organization_id(value: &str) -> Result<OrganizationId, ApiError> {
    Uuid::parse_str(value)
        .map(OrganizationId)
        .map_err(|_| ApiError::BadRequest(format!("Invalid organization id '{}'", value)))
}
