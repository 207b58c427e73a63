use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::HeaderName;
use axum::http::{Method, Response};
use axum::response::IntoResponse;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::games::backend_2048_game::{create_router as create_2048_game_router, Game2048State};
use crate::services::preference_service::PreferenceBackend;

mod config;
mod error;
mod games;
mod logging;
mod services;

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

pub async fn health_check() -> impl IntoResponse {
    Response::new(Body::from("OK"))
}

fn build_app(game_2048_state: Arc<Game2048State>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(vec![
            HeaderName::from_static("content-type"),
            HeaderName::from_static("x-session-signature"),
        ]);

    Router::new()
        .route("/api/health_check", axum::routing::get(health_check))
        .nest("/2048", create_2048_game_router().with_state(game_2048_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::from_path(".env").ok();
    logging::setup()?;

    let config = Config::from_env();
    let preferences = PreferenceBackend::from_url(config.redis_url.as_deref())?;
    let addr = config.bind_addr;
    let game_2048_state = Arc::new(Game2048State::new(config, preferences));

    let cleanup_state = game_2048_state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = cleanup_state.cleanup_expired_sessions().await;
            if removed > 0 {
                info!("Cleaned up {} expired 2048 sessions", removed);
            }
        }
    });

    let app = build_app(game_2048_state);

    let listener = TcpListener::bind(addr).await?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
