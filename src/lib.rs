pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod store;

pub use api::handlers;
pub use api::routes;

pub use model::*;

pub use store::{MemoryStore, PostgresStore, Store};

/// Serve the API on an already bound listener until the server stops
pub async fn serve_app<S: Store + 'static>(
    listener: tokio::net::TcpListener,
    state: api::AppState<S>,
) -> anyhow::Result<()> {
    let app = api::routes::build_app(state);
    axum::serve(listener, app).await?;
    Ok(())
}
