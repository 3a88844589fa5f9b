use axum::{routing::get, routing::post, Router};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};

use crate::api::handlers::AppState;
use crate::api::{document_handlers, entity_handlers, handlers, sync_handlers};
use crate::store::traits::Store;

/// Upper bound for request bodies (directory sync batches are the largest)
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/", get(handlers::health_check::<S>))
        .route("/health", get(handlers::health_check::<S>))
        // Documents
        .route(
            "/documents",
            get(document_handlers::list_documents::<S>)
                .post(document_handlers::create_document::<S>),
        )
        .route(
            "/documents/:id",
            get(document_handlers::get_document::<S>)
                .put(document_handlers::update_document::<S>)
                .delete(document_handlers::delete_document::<S>),
        )
        // Offices
        .route(
            "/offices",
            get(entity_handlers::list_offices::<S>).post(entity_handlers::create_office::<S>),
        )
        .route(
            "/offices/:id",
            get(entity_handlers::get_office::<S>)
                .put(entity_handlers::update_office::<S>)
                .delete(entity_handlers::delete_office::<S>),
        )
        // Departments
        .route(
            "/departments",
            get(entity_handlers::list_departments::<S>)
                .post(entity_handlers::create_department::<S>),
        )
        .route(
            "/departments/:id",
            get(entity_handlers::get_department::<S>)
                .put(entity_handlers::update_department::<S>)
                .delete(entity_handlers::delete_department::<S>),
        )
        // Directory users and clients
        .route(
            "/users/sync-azure-ad",
            post(sync_handlers::sync_directory_users::<S>),
        )
        .route(
            "/users/azure-ad",
            get(sync_handlers::list_directory_users::<S>),
        )
        .route(
            "/users/clients",
            get(entity_handlers::list_clients::<S>).post(entity_handlers::create_client::<S>),
        )
        .route(
            "/users/clients/:id",
            get(entity_handlers::get_client::<S>)
                .put(entity_handlers::update_client::<S>)
                .delete(entity_handlers::delete_client::<S>),
        )
}

/// Router with state and the HTTP layers applied, ready to serve
pub fn build_app<S: Store + 'static>(state: AppState<S>) -> Router {
    create_router()
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
}
