//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, compression, the body
//! limit, the `/api` rate limiter and an optional static file fallback.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use helpdesk_core::config::{expand_home, HelpdeskConfig, ServerConfig};
use helpdesk_core::error::{HelpdeskError, Result};

use crate::handlers;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::state::AppState;

const BODY_LIMIT_BYTES: usize = 1024 * 1024;

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origin = if server.cors_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = server
            .cors_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;

    let mut api_routes = Router::new()
        .route("/search", post(handlers::search))
        .route("/classify", post(handlers::classify))
        .route("/add-ticket", post(handlers::add_ticket))
        .route("/categories", get(handlers::categories));

    if server.rate_limit_per_sec > 0 {
        api_routes = api_routes
            .layer(axum::middleware::from_fn(rate_limit_middleware))
            .layer(axum::Extension(RateLimiter::new(server.rate_limit_per_sec)));
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api_routes);

    if let Some(dir) = server.static_dir.as_deref() {
        let dir = expand_home(dir);
        tracing::info!(dir = %dir.display(), "Serving static files");
        router = router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    let cors = cors_layer(server);

    router
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind the configured address and serve until the process exits.
pub async fn start_server(config: &HelpdeskConfig, state: AppState) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| HelpdeskError::Api(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!(%addr, "API server listening");

    axum::serve(listener, router)
        .await
        .map_err(|e| HelpdeskError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
