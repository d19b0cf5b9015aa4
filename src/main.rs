use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use moviemate_api::api::{create_router, AppState};
use moviemate_api::config::Config;
use moviemate_api::db;
use moviemate_api::engine::{EngineConfig, RecommendationEngine};
use moviemate_api::services::metadata::tmdb::TmdbProvider;
use moviemate_api::store::Dataset;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    // A missing or corrupt dataset aborts startup; it is never a
    // per-request error
    let dataset = Dataset::load(&config.movies_path, &config.ratings_path)?;
    let engine = RecommendationEngine::new(dataset, EngineConfig::from(&config))?;

    let redis_client = db::create_redis_client(&config.redis_url)?;
    let (cache, _cache_writer) = db::Cache::new(redis_client).await;
    let metadata = Arc::new(TmdbProvider::new(
        cache,
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
    ));

    let state = AppState::new(engine, metadata);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(host = %config.host, port = config.port, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
