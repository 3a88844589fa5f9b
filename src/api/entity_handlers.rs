use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::handlers::AppState;
use crate::api::validation::ValidatedJson;
use crate::model::{
    Client, ClientUpdate, Department, DepartmentUpdate, NewClient, NewDepartment, NewOffice,
    Office, OfficeUpdate, OrganizationId,
};
use crate::store::Store;

// Offices

pub async fn list_offices<S: Store>(
    State(state): State<AppState<S>>,
    org: OrganizationId,
) -> Result<Json<Vec<Office>>, ApiError> {
    Ok(Json(state.store.list_offices(org).await?))
}

pub async fn get_office<S: Store>(
    State(state): State<AppState<S>>,
    org: OrganizationId,
    Path(id): Path<Uuid>,
) -> Result<Json<Office>, ApiError> {
    state
        .store
        .get_office(org, &id)
        .await?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

pub async fn create_office<S: Store>(
    State(state): State<AppState<S>>,
    org: OrganizationId,
    ValidatedJson(new_office): ValidatedJson<NewOffice>,
) -> Result<(StatusCode, Json<Office>), ApiError> {
    let office = state.store.create_office(org, new_office).await?;
    log::info!("Created office {} for organization {}", office.id, org);
    Ok((StatusCode::CREATED, Json(office)))
}

pub async fn update_office<S: Store>(
    State(state): State<AppState<S>>,
    org: OrganizationId,
    Path(id): Path<Uuid>,
    ValidatedJson(update): ValidatedJson<OfficeUpdate>,
) -> Result<Json<Office>, ApiError> {
    state
        .store
        .update_office(org, &id, update)
        .await?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

pub async fn delete_office<S: Store>(
    State(state): State<AppState<S>>,
    org: OrganizationId,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_office(org, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Departments

pub async fn list_departments<S: Store>(
    State(state): State<AppState<S>>,
    org: OrganizationId,
) -> Result<Json<Vec<Department>>, ApiError> {
    Ok(Json(state.store.list_departments(org).await?))
}

pub async fn get_department<S: Store>(
    State(state): State<AppState<S>>,
    org: OrganizationId,
    Path(id): Path<Uuid>,
) -> Result<Json<Department>, ApiError> {
    state
        .store
        .get_department(org, &id)
        .await?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

pub async fn create_department<S: Store>(
    State(state): State<AppState<S>>,
    org: OrganizationId,
    ValidatedJson(new_department): ValidatedJson<NewDepartment>,
) -> Result<(StatusCode, Json<Department>), ApiError> {
    let department = state.store.create_department(org, new_department).await?;
    log::info!(
        "Created department {} for organization {}",
        department.id,
        org
    );
    Ok((StatusCode::CREATED, Json(department)))
}

pub async fn update_department<S: Store>(
    State(state): State<AppState<S>>,
    org: OrganizationId,
    Path(id): Path<Uuid>,
    ValidatedJson(update): ValidatedJson<DepartmentUpdate>,
) -> Result<Json<Department>, ApiError> {
    state
        .store
        .update_department(org, &id, update)
        .await?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

pub async fn delete_department<S: Store>(
    State(state): State<AppState<S>>,
    org: OrganizationId,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_department(org, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Clients

pub async fn list_clients<S: Store>(
    State(state): State<AppState<S>>,
    org: OrganizationId,
) -> Result<Json<Vec<Client>>, ApiError> {
    Ok(Json(state.store.list_clients(org).await?))
}

pub async fn get_client<S: Store>(
    State(state): State<AppState<S>>,
    org: OrganizationId,
    Path(id): Path<Uuid>,
) -> Result<Json<Client>, ApiError> {
    state
        .store
        .get_client(org, &id)
        .await?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

pub async fn create_client<S: Store>(
    State(state): State<AppState<S>>,
    org: OrganizationId,
    ValidatedJson(new_client): ValidatedJson<NewClient>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let client = state.store.create_client(org, new_client).await?;
    log::info!("Created client {} for organization {}", client.id, org);
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn update_client<S: Store>(
    State(state): State<AppState<S>>,
    org: OrganizationId,
    Path(id): Path<Uuid>,
    ValidatedJson(update): ValidatedJson<ClientUpdate>,
) -> Result<Json<Client>, ApiError> {
    state
        .store
        .update_client(org, &id, update)
        .await?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

pub async fn delete_client<S: Store>(
    State(state): State<AppState<S>>,
    org: OrganizationId,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_client(org, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
