mod app;
mod auth;
mod config;
mod content;
mod error;
mod extract;
mod members;
mod nullable;
mod pagination;
mod state;
mod users;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "ojumountain=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    tracing::info!(algorithm = ?config.jwt.algorithm, ttl_minutes = config.jwt.ttl_minutes, "configuration loaded");

    let state = AppState::init(config).await?;
    let (host, port) = (state.config.host.clone(), state.config.port);

    sqlx::migrate!("./migrations").run(&state.db).await?;
    tracing::info!("migrations applied");

    app::serve(app::build_app(state), &host, port).await
}
