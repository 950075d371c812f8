//! Router setup with all API routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use grocer_core::error::GrocerError;

use crate::handlers;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
///
/// Health stays outside the rate limiter so probes are never throttled.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .api
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let public_routes = Router::new().route("/api/health", get(handlers::health));

    let mut chat_routes = Router::new()
        .route("/api/chat", post(handlers::chat))
        .route("/api/reset", post(handlers::reset))
        .route("/api/history", get(handlers::history));

    // Zero disables the limiter.
    if state.api.rate_limit_per_sec > 0 {
        let limiter = RateLimiter::new(state.api.rate_limit_per_sec);
        chat_routes = chat_routes
            .layer(axum::middleware::from_fn(rate_limit_middleware))
            .layer(axum::Extension(limiter));
    }

    let body_limit = state.api.max_body_bytes;

    public_routes
        .merge(chat_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind to `127.0.0.1:port` and serve until the process exits.
pub async fn start_server(port: u16, state: AppState) -> Result<(), GrocerError> {
    let addr = format!("127.0.0.1:{}", port);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GrocerError::Api(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!(addr = %addr, "API server listening");

    axum::serve(listener, router)
        .await
        .map_err(|e| GrocerError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
