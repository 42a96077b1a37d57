//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, compression, and all
//! endpoint handlers. CORS is permissive: sessions are driven by browser
//! frontends served from arbitrary origins.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/templates", get(handlers::list_templates))
        .route("/templates/{template_id}", get(handlers::get_template))
        .route("/sessions/start", post(handlers::start_session))
        .route(
            "/sessions/{session_id}/submit_answers",
            post(handlers::submit_answers),
        )
        .route("/sessions/{session_id}", get(handlers::get_session))
        .route(
            "/sessions/{session_id}/generate",
            post(handlers::generate_document),
        )
        .route(
            "/sessions/{session_id}/documents",
            get(handlers::list_session_documents),
        )
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB global limit
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured address.
pub async fn start_server(state: AppState) -> Result<(), docuflow_core::error::DocuflowError> {
    let port = std::env::var("DOCUFLOW_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(state.config.server.port);
    let addr = format!("{}:{}", state.config.server.host, port);

    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| docuflow_core::error::DocuflowError::Api(format!("Failed to bind: {}", e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| docuflow_core::error::DocuflowError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
