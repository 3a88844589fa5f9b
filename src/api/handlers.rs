use axum::{extract::State, response::Json};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Shared state handed to every handler
pub struct AppState<S> {
    pub store: Arc<S>,
    /// Deployment environment name reported by the health check
    pub environment: Arc<str>,
}

impl<S> AppState<S> {
    pub fn new(store: Arc<S>, environment: &str) -> Self {
        Self {
            store,
            environment: Arc::from(environment),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            environment: Arc::clone(&self.environment),
        }
    }
}

/// Static health report; nothing is probed
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub environment: String,
    pub services: BTreeMap<String, String>,
}

pub async fn health_check<S: Send + Sync + 'static>(
    State(state): State<AppState<S>>,
) -> Json<HealthResponse> {
    log::debug!("Health check requested");

    let services = ["database", "authentication", "storage"]
        .into_iter()
        .map(|service| (service.to_string(), "ok".to_string()))
        .collect();

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.environment.to_string(),
        services,
    })
}
