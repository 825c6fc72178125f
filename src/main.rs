use axum::routing::get;
use axum::Router;
use tracing_subscriber::EnvFilter;

use dish_insight::api;
use dish_insight::config::Config;
use dish_insight::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        "LLM provider: {} ({})",
        config.llm.provider,
        config.llm.base_url
    );
    tracing::info!("Retrieval mode: {:?}", config.pipeline.retrieval_mode);
    if config.fetch.yelp_api_key.is_none() {
        tracing::warn!("YELP_API_KEY not set; Yelp fetches will contribute nothing");
    }

    let state = AppState::new(config.clone())?;

    let app = Router::new()
        .route("/decode-menu", get(api::decode::decode_menu))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
