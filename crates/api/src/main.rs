use anyhow::Context;

use mall_api::app::AppState;
use mall_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mall_observability::init();

    let config = ApiConfig::from_env()?;
    let state = AppState::from_config(&config)?;
    let app = mall_api::app::build_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
