//! docuflow API crate - axum HTTP server and route handlers.
//!
//! Exposes the REST API for the document generation platform: template
//! listing, session lifecycle (start, submit answers, inspect), document
//! generation, and health checks.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
