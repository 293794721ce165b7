//!
//! Incoming chat completion request validation and normalization.
//!
//! Turns a raw JSON body of unknown shape into a [`ChatRequest`] or a
//! validation error, without touching any field the pipeline does not need.
//! Unknown fields are ignored for forward compatibility with the OpenAI
//! wire format.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use serde_json::Value;

use crate::error::{ProxyError, Result};

/* --- types ----------------------------------------------------------------------------------- */

///
/// Normalized OpenAI-style chat completion request.
///
/// Constructed once per call and immutable thereafter. Messages are kept as
/// opaque JSON values: their internal role/content structure is the
/// backend's business, not the proxy's.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /** requested model identifier, echoed back in every response */
    pub model: String,
    /** ordered conversation messages, passed through verbatim */
    pub messages: Vec<Value>,
    /** whether the caller asked for a simulated SSE stream */
    pub stream: bool,
}

/* --- start of code -------------------------------------------------------------------------- */

///
/// Validate and normalize a parsed chat completion request body.
///
/// `model` must be a non-empty string and `messages` a non-empty array;
/// anything else fails construction. `stream` is read permissively: only
/// the literal JSON `true` enables streaming, any other value (or absence)
/// means a plain JSON response. Pure function, no side effects.
///
/// # Arguments
///  * `raw` - parsed JSON value of unknown shape
///
/// # Returns
///  * Normalized request on success
///  * `ProxyError::InvalidRequest` when `model` or `messages` is unusable
pub fn validate_chat_request(raw: &Value) -> Result<ChatRequest> {
    let model = match raw.get("model").and_then(Value::as_str) {
        Some(model) if !model.is_empty() => model.to_string(),
        _ => return Err(ProxyError::InvalidRequest("missing or invalid model".to_string())),
    };

    let messages = match raw.get("messages").and_then(Value::as_array) {
        Some(messages) if !messages.is_empty() => messages.clone(),
        _ => return Err(ProxyError::InvalidRequest("missing or invalid messages".to_string())),
    };

    let stream = matches!(raw.get("stream"), Some(Value::Bool(true)));

    Ok(ChatRequest { model, messages, stream })
}

/* --- tests ----------------------------------------------------------------------------------- */
