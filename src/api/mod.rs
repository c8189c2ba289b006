//! REST API and WebSocket server for the admin surface
//!
//! ## Endpoints
//!
//! - `GET /api/v1/health` - Health check
//! - `GET /api/v1/schedule` - Scheduled checks with next and last run
//! - `GET /api/v1/events` - Status change history
//! - `POST /api/v1/checks/:id/check-now` - Run a check immediately
//! - `POST /api/v1/checks/:id/activate` - Activate and schedule a check
//! - `POST /api/v1/checks/:id/deactivate` - Deactivate and unschedule a check
//! - `PUT /api/v1/monitoring` - Toggle global monitoring
//! - `WS /api/v1/stream` - Real-time notification stream

#[cfg(feature = "api")]
pub mod error;
#[cfg(feature = "api")]
pub mod routes;
#[cfg(feature = "api")]
pub mod state;
#[cfg(feature = "api")]
pub mod types;
#[cfg(feature = "api")]
pub mod websocket;

#[cfg(feature = "api")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "api")]
pub use state::ApiState;

#[cfg(feature = "api")]
use axum::{
    Router,
    routing::{get, post, put},
};
use std::net::SocketAddr;

use crate::config::ApiSection;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8080")
    pub bind_addr: SocketAddr,

    /// Enable CORS for dashboards served elsewhere
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            enable_cors: true,
        }
    }
}

impl From<&ApiSection> for ApiConfig {
    fn from(section: &ApiSection) -> Self {
        Self {
            bind_addr: section.bind,
            enable_cors: section.enable_cors,
        }
    }
}

/// Build the router with every route
#[cfg(feature = "api")]
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/schedule", get(routes::schedule::list_schedule))
        .route("/api/v1/events", get(routes::schedule::list_events))
        .route(
            "/api/v1/checks/:id/check-now",
            post(routes::checks::check_now),
        )
        .route(
            "/api/v1/checks/:id/activate",
            post(routes::checks::activate),
        )
        .route(
            "/api/v1/checks/:id/deactivate",
            post(routes::checks::deactivate),
        )
        .route(
            "/api/v1/checks/:id/interval",
            put(routes::checks::set_interval),
        )
        .route(
            "/api/v1/monitoring",
            put(routes::monitoring::set_monitoring),
        )
        .route("/api/v1/stream", get(websocket::websocket_handler))
        .with_state(state)
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
#[cfg(feature = "api")]
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;
    use tracing::info;

    info!("starting API server on {}", config.bind_addr);

    let mut app = router(state).layer(TraceLayer::new_for_http());

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
