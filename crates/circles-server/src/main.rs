use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use circles_api::auth::{AppState, AppStateInner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "circles=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("CIRCLES_DB_PATH").unwrap_or_else(|_| "circles.db".into());
    let host = std::env::var("CIRCLES_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("CIRCLES_PORT")
        .unwrap_or_else(|_| "8000".into())
        .parse()?;
    let session_ttl_minutes: i64 = std::env::var("CIRCLES_SESSION_TTL_MINUTES")
        .unwrap_or_else(|_| (60 * 24).to_string())
        .parse()?;

    // Init database
    let db = circles_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        session_ttl: chrono::Duration::minutes(session_ttl_minutes),
    });

    let app = Router::new()
        .nest("/api/v1", circles_api::router(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Circles server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
