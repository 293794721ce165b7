//!
//! HTTP server implementation for the OpenAI-compatible Gemini proxy.
//!
//! Routes incoming chat completion requests through validation, one adapter
//! invocation, and response composition, with proper error handling and
//! logging. Follows Dependency Inversion Principle by depending on the
//! backend abstraction rather than the concrete adapter process.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde_json::{Value, json};

use crate::backend::{AdapterBackend, BackendCommand, GenerationBackend};
use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::request::{ChatRequest, validate_chat_request};
use crate::response::{completion_response, stream_completion};

/* --- types ----------------------------------------------------------------------------------- */

///
/// Application state containing all dependencies.
///
/// Configuration is read-only after startup and safe for unsynchronized
/// concurrent reads; the backend is shared behind the trait object so tests
/// and future transports can swap the adapter process out.
pub struct AppState {
    /** application configuration */
    pub config: Config,
    /** text-generation backend invoked once per request */
    pub backend: Arc<dyn GenerationBackend>,
}

/* --- constants ------------------------------------------------------------------------------ */

/** availability message served on the root route */
const ROOT_MESSAGE: &str = "GeminiMux OpenAI-compatible proxy is running";

/* --- start of code -------------------------------------------------------------------------- */

impl AppState {
    ///
    /// Create new application state with the standard adapter backend.
    ///
    /// # Arguments
    ///  * `config` - application configuration
    ///
    /// # Returns
    ///  * Application state with initialized dependencies
    pub fn new(config: Config) -> Self {
        let backend = Arc::new(AdapterBackend::new(&config));
        Self { config, backend }
    }

    ///
    /// Create application state with a caller-provided backend.
    ///
    /// Used by tests and by embedders that bring their own transport.
    ///
    /// # Arguments
    ///  * `config` - application configuration
    ///  * `backend` - backend implementation to invoke
    pub fn with_backend(config: Config, backend: Arc<dyn GenerationBackend>) -> Self {
        Self { config, backend }
    }
}

///
/// Handle OpenAI-compatible chat completions endpoint.
///
/// Processes the raw request body through validation, a single backend
/// invocation, and response composition. Every failure is converted to the
/// OpenAI error document here; nothing propagates uncaught.
///
/// # Arguments
///  * `state` - shared application state
///  * `body` - raw request body bytes
///
/// # Returns
///  * HTTP response with a completion document, an SSE stream, or an error
pub async fn chat_completions(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match process_chat_completion(state, body).await {
        Ok(response) => response,
        Err(e) => create_error_response(&e),
    }
}

///
/// Process a chat completion request end-to-end.
///
/// The body is parsed by hand rather than through the JSON extractor so a
/// malformed body produces the same error document as every other failure.
/// The decision to stream is committed only after a successful backend
/// result: earlier failures always use the plain JSON error path, even when
/// the caller asked for a stream.
///
/// # Arguments
///  * `state` - shared application state
///  * `body` - raw request body bytes
///
/// # Returns
///  * HTTP response on success
///  * `ProxyError` on failure
async fn process_chat_completion(state: Arc<AppState>, body: Bytes) -> Result<Response> {
    let raw: Value = serde_json::from_slice(&body)
        .map_err(|e| ProxyError::InvalidRequest(format!("invalid JSON body: {}", e)))?;

    let chat_request = validate_chat_request(&raw)?;
    log_incoming_request(&chat_request);

    let command = BackendCommand::from_request(&state.config, &chat_request)?;
    let reply = state.backend.invoke(command).await?;

    if chat_request.stream {
        Ok(stream_completion(&chat_request.model, reply.text))
    } else {
        Ok(Json(completion_response(&chat_request.model, &reply.text)).into_response())
    }
}

///
/// Log details about the incoming request.
///
/// # Arguments
///  * `request` - validated chat request
fn log_incoming_request(request: &ChatRequest) {
    tracing::debug!(
        "chat completion request: model={} messages={} stream={}",
        request.model,
        request.messages.len(),
        request.stream
    );
}

///
/// Handle the root availability endpoint.
///
/// # Returns
///  * Fixed plaintext availability message
pub async fn root() -> &'static str {
    ROOT_MESSAGE
}

///
/// Create an error response in the OpenAI error document shape.
///
/// Server-side failures are logged with their full detail; the caller sees
/// the taxonomy's client-facing message. Protocol violations in particular
/// never echo the malformed backend payload to the caller.
///
/// # Arguments
///  * `error` - error to convert to HTTP response
///
/// # Returns
///  * HTTP error response with JSON error details
fn create_error_response(error: &ProxyError) -> Response {
    let (status_code, error_type) = match error {
        ProxyError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request_error"),
        ProxyError::BackendReported { error_type, .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, error_type.as_str())
        }
        ProxyError::Config(_)
        | ProxyError::Http(_)
        | ProxyError::Protocol(_)
        | ProxyError::Invocation(_)
        | ProxyError::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "api_error"),
    };

    if status_code.is_server_error() {
        tracing::error!("request failed: {}", error);
    }

    let message = match error {
        // full detail stays in the log line above
        ProxyError::Protocol(_) => "Backend returned a malformed response.".to_string(),
        other => other.to_string(),
    };

    let error_response = json!({
      "error": {
        "message": message,
        "type": error_type
      }
    });

    (status_code, Json(error_response)).into_response()
}

/* --- tests ----------------------------------------------------------------------------------- */
