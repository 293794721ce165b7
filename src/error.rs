//!
//! Error handling for the OpenAI-compatible Gemini proxy server.
//!
//! Defines all error types used throughout the application using thiserror
//! for ergonomic error handling. Each variant maps to one failure class the
//! HTTP edge knows how to report.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use thiserror::Error;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Application error types following Rust best practices.
///
/// Covers all failure conditions of the request pipeline. Uses thiserror for
/// automatic Display and Error trait implementations.
///
/// The split between [`ProxyError::BackendReported`], [`ProxyError::Protocol`]
/// and [`ProxyError::Invocation`] matters for what reaches the caller: a
/// backend-reported failure is forwarded verbatim (message and type), a
/// protocol violation keeps its detail server-side and surfaces generically,
/// and an invocation failure carries the local I/O detail in its message.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Malformed body, missing/invalid `model` or `messages`. Always a 400.
    #[error("{0}")]
    InvalidRequest(String),

    /// Required server-side configuration is absent (e.g. the session
    /// credential). Never echoes configured values.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server-level HTTP failure outside the request pipeline (bind/serve).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The adapter exited non-zero with a well-formed `{error:{message,type}}`
    /// document on stderr. Both fields pass through to the caller untouched.
    #[error("{message}")]
    BackendReported { message: String, error_type: String },

    /// The adapter broke its stdio contract: exit 0 with malformed output or
    /// a missing/non-string `text` field. The detail (including the raw
    /// payload) is for server logs only.
    #[error("Backend protocol violation: {0}")]
    Protocol(String),

    /// The adapter process could not be driven at all: spawn failure, a
    /// broken stdin/stdout channel, or the invocation deadline expiring.
    #[error("Backend invocation failed: {0}")]
    Invocation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/* --- start of code -------------------------------------------------------------------------- */

/// Result type alias for cleaner error handling throughout the application
pub type Result<T> = std::result::Result<T, ProxyError>;
