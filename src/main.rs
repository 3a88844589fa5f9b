use office_docs::api::AppState;
use office_docs::config::AppConfig;
use office_docs::serve_app;
use office_docs::store::{MemoryStore, PostgresStore, Store};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("sqlx", LevelFilter::Warn)
        .parse_default_env()
        .init();

    let config = AppConfig::load()?;
    log::info!(
        "Configuration loaded: server={}:{} environment={}",
        config.server.host,
        config.server.port,
        config.environment
    );

    // In-memory mode for local runs without databases
    if std::env::var("OFFICE_DOCS_IN_MEMORY").unwrap_or_default() == "true" {
        let store = MemoryStore::new();
        let org = store.add_organization("Default Organization");
        log::info!("Using in-memory store with organization {}", org);
        return run_server(Arc::new(store), &config).await;
    }

    let store = PostgresStore::from_config(&config)?;
    log::info!("Running database migrations...");
    store.migrate().await?;

    run_server(Arc::new(store), &config).await
}

async fn run_server<S: Store + 'static>(store: Arc<S>, config: &AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Office documents API running on http://{}", bind_address);

    serve_app(listener, AppState::new(store, &config.environment)).await
}
