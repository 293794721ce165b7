//! # GeminiMux - Gemini Session to OpenAI Proxy Library
//!
//! This crate provides a proxy server that serves OpenAI-compatible chat
//! completion requests from a credential-based Gemini web session. The
//! session itself is driven by a one-shot adapter subprocess speaking JSON
//! over stdin/stdout/stderr; this crate owns request validation, the
//! subprocess invocation, and both response shapes (a complete JSON document
//! or a simulated Server-Sent Events stream). While primarily designed as a
//! binary application, the library exposes its pipeline for programmatic use.
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use geminimux::{Config, create_app};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load configuration
//!     let config = Config::from_env()?;
//!
//!     // Create the application
//!     let app = create_app(config);
//!
//!     // Start server
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Configuration management and environment variable handling
//! - [`request`] - Incoming request validation and normalization
//! - [`backend`] - Adapter subprocess invocation ([`backend::GenerationBackend`])
//! - [`response`] - OpenAI wire shapes, JSON and simulated SSE composition
//! - [`server`] - HTTP route handlers and error conversion
//! - [`error`] - Error types and handling

pub mod backend;
pub mod config;
pub mod error;
pub mod request;
pub mod response;
pub mod server;

// Re-export commonly used types
pub use config::{Config, ValidationIssue, ValidationSeverity};
pub use error::ProxyError;

/// Creates a new GeminiMux application with the given configuration.
///
/// This is a convenience function that sets up the full application stack
/// including the adapter backend, routing, and middleware.
///
/// # Arguments
///
/// * `config` - Application configuration
///
/// # Returns
///
/// Returns an Axum Router that can be served directly.
///
/// # Examples
///
/// ```rust,no_run
/// use geminimux::{Config, create_app};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::from_env()?;
///     let app = create_app(config);
///
///     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
///     axum::serve(listener, app).await?;
///     Ok(())
/// }
/// ```
pub fn create_app(config: Config) -> axum::Router {
    use std::sync::Arc;

    build_router(Arc::new(server::AppState::new(config)))
}

/// Creates the application router around existing state.
///
/// Separate from [`create_app`] so tests and embedders can wire in a custom
/// [`backend::GenerationBackend`] via [`server::AppState::with_backend`].
///
/// # Arguments
///
/// * `state` - shared application state
///
/// # Returns
///
/// Returns the configured Axum Router.
pub fn build_router(state: std::sync::Arc<server::AppState>) -> axum::Router {
    use axum::Router;
    use axum::routing::{get, post};
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/v1/chat/completions", post(server::chat_completions))
        .route("/", get(server::root))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
