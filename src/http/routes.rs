//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let cors = match &state.config.client_origin {
        Some(origins) => {
            let allowed_origins: Vec<header::HeaderValue> = origins
                .split(',')
                .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
                .collect();
            CorsLayer::new().allow_origin(allowed_origins)
        }
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods([Method::GET, Method::OPTIONS]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    players: usize,
    coins: usize,
    tick: u64,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = &state.arena.stats;

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        players: stats.players(),
        coins: stats.coins(),
        tick: stats.tick(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, GameConfig};
    use crate::game::GameArena;

    #[tokio::test]
    async fn health_reports_arena_counters() {
        let (_arena, handle) = GameArena::new(GameConfig::default());
        let state = AppState::new(
            Config {
                server_addr: "127.0.0.1:0".parse().unwrap(),
                log_level: "info".to_string(),
                client_origin: None,
                game: GameConfig::default(),
            },
            handle,
        );

        let Json(health) = health_handler(State(state)).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.players, 0);
        assert_eq!(health.tick, 0);
    }
}
