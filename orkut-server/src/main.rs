use anyhow::Context;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orkut_server::{
    app::build_router,
    config::{Settings, DEFAULT_JWT_SECRET},
    db::Database,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orkut_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::new().context("Failed to load settings")?;
    if settings.auth.jwt_secret == DEFAULT_JWT_SECRET {
        tracing::warn!("JWT_SECRET is not set; using the development secret");
    }

    let db = Database::new(&settings.database.path).context("Failed to create database")?;
    db.initialize().context("Failed to initialize database schema")?;
    tracing::info!("Database initialized at {}", settings.database.path);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Failed to parse server address")?;

    let state = AppState::new(db, settings);

    match state.session_manager.cleanup_expired_sessions() {
        Ok(count) => tracing::info!("Removed {} expired sessions on startup", count),
        Err(e) => tracing::error!("Failed to cleanup expired sessions on startup: {}", e),
    }

    // Periodic session cleanup
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            tracing::debug!("Running periodic session cleanup...");
            if let Err(e) = cleanup_state.session_manager.cleanup_expired_sessions() {
                tracing::error!("Periodic session cleanup failed: {}", e);
            }
        }
    });

    let app = build_router(state);

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
