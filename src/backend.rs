//!
//! Backend invocation over a one-shot adapter subprocess.
//!
//! The Gemini web session lives behind a Python adapter script; each request
//! spawns one adapter process, pipes a single JSON command to its stdin, and
//! interprets its exit status together with the full contents of stdout and
//! stderr. The [`GenerationBackend`] trait keeps the process mechanics
//! swappable for a real network client without touching response composition.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::request::ChatRequest;

/* --- types ----------------------------------------------------------------------------------- */

///
/// One serialized command for the adapter process.
///
/// Created immediately before invocation, written to the child's stdin as a
/// single JSON document, then discarded. `psidts` is serialized as JSON
/// `null` when absent; the adapter decides whether it can work without it.
#[derive(Debug, Serialize)]
pub struct BackendCommand {
    /** primary session credential */
    pub psid: String,
    /** secondary session credential, passed through even when absent */
    pub psidts: Option<String>,
    /** requested model identifier, copied verbatim from the request */
    pub model: String,
    /** conversation messages, copied verbatim from the request */
    pub messages: Vec<Value>,
}

///
/// Successful adapter result: the complete generated reply.
#[derive(Debug, Clone)]
pub struct BackendReply {
    /** full generated text, exactly as the adapter produced it */
    pub text: String,
}

///
/// Trait that every text-generation backend must implement.
///
/// One invocation per chat request; implementations own their transport
/// (child process today, possibly a network client later) and translate its
/// failures into the shared error taxonomy.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    ///
    /// Execute one blocking, non-streaming generation call.
    async fn invoke(&self, command: BackendCommand) -> Result<BackendReply>;
}

///
/// Subprocess-backed [`GenerationBackend`] driving the Gemini adapter script.
///
/// Spawns a fresh child per invocation; no pooling, no retries, no process
/// reuse. A caller disconnect does not kill a running child - the process
/// finishes on its own and is reaped by the runtime.
#[derive(Debug, Clone)]
pub struct AdapterBackend {
    /** program to execute (interpreter) */
    program: String,
    /** adapter script path handed to the interpreter */
    script: String,
    /** per-invocation deadline, None for an unbounded wait */
    timeout: Option<Duration>,
}

/* --- constants ------------------------------------------------------------------------------ */

/** interpreter used to run the adapter */
const ADAPTER_PROGRAM: &str = "python3";

/** adapter script, resolved relative to the server working directory */
pub const ADAPTER_SCRIPT: &str = "python/gemini_adapter.py";

/* --- start of code -------------------------------------------------------------------------- */

impl BackendCommand {
    ///
    /// Build the adapter command for one validated request.
    ///
    /// Reads the credential pair from configuration; the primary credential
    /// is required and its absence is a server fault, not a client error.
    ///
    /// # Arguments
    ///  * `config` - application configuration holding the credential pair
    ///  * `request` - validated chat request
    ///
    /// # Returns
    ///  * Command ready for serialization
    ///  * `ProxyError::Config` when the primary credential is missing
    pub fn from_request(config: &Config, request: &ChatRequest) -> Result<Self> {
        let psid = config.psid.clone().ok_or_else(|| {
            ProxyError::Config("GEMINI_PSID session credential is not configured".to_string())
        })?;

        Ok(Self {
            psid,
            psidts: config.psidts.clone(),
            model: request.model.clone(),
            messages: request.messages.clone(),
        })
    }
}

impl AdapterBackend {
    ///
    /// Create the standard adapter backend with the built-in argument list.
    ///
    /// # Arguments
    ///  * `config` - application configuration (deadline setting)
    ///
    /// # Returns
    ///  * Backend invoking `python3 python/gemini_adapter.py`
    pub fn new(config: &Config) -> Self {
        Self::with_command(ADAPTER_PROGRAM, ADAPTER_SCRIPT, config.backend_timeout_secs)
    }

    ///
    /// Create a backend for an alternate adapter command.
    ///
    /// Used by tests (stub scripts) and available for future adapters that
    /// speak the same stdin/stdout/stderr contract.
    ///
    /// # Arguments
    ///  * `program` - program to execute
    ///  * `script` - script path passed as the single argument
    ///  * `timeout_secs` - invocation deadline in seconds, 0 for unbounded
    pub fn with_command(program: &str, script: &str, timeout_secs: u64) -> Self {
        let timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));
        Self { program: program.to_string(), script: script.to_string(), timeout }
    }
}

#[async_trait]
impl GenerationBackend for AdapterBackend {
    ///
    /// Run one adapter process to completion and interpret its result.
    ///
    /// The command is written to stdin in full and stdin is closed before
    /// waiting, so the adapter sees end-of-input without relying on lazy
    /// buffer flushes. Both output channels are collected to end-of-stream;
    /// partial reads would silently truncate long replies.
    ///
    /// # Arguments
    ///  * `command` - serialized to the child's stdin as one JSON document
    ///
    /// # Returns
    ///  * The generated reply on exit 0 with a well-formed payload
    ///  * `ProxyError::BackendReported` / `Protocol` / `Invocation` otherwise
    async fn invoke(&self, command: BackendCommand) -> Result<BackendReply> {
        let payload = serde_json::to_vec(&command)?;

        tracing::debug!("spawning adapter: {} {}", self.program, self.script);

        let mut child = Command::new(&self.program)
            .arg(&self.script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ProxyError::Invocation(format!("could not start adapter process: {}", e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProxyError::Invocation("adapter stdin channel missing".to_string()))?;
        stdin.write_all(&payload).await.map_err(|e| {
            ProxyError::Invocation(format!("could not write adapter stdin: {}", e))
        })?;
        stdin.shutdown().await.map_err(|e| {
            ProxyError::Invocation(format!("could not close adapter stdin: {}", e))
        })?;
        drop(stdin);

        let collected = child.wait_with_output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, collected).await.map_err(|_| {
                // The child is not killed; it finishes on its own and the
                // runtime reaps it. Only this request gives up on it.
                ProxyError::Invocation(format!(
                    "adapter did not finish within {}s",
                    limit.as_secs()
                ))
            })?,
            None => collected.await,
        }
        .map_err(|e| ProxyError::Invocation(format!("could not collect adapter output: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(output.status.code(), &stderr));
        }

        parse_reply(&output.stdout)
    }
}

///
/// Parse the adapter's stdout into a reply.
///
/// Exit 0 promises exactly one JSON object with a string `text` field; extra
/// fields are ignored. Anything else is a protocol violation whose raw
/// payload stays in the error detail for server-side logs only.
///
/// # Arguments
///  * `stdout` - complete stdout contents of the exited adapter
///
/// # Returns
///  * Parsed reply
///  * `ProxyError::Protocol` when the payload breaks the contract
fn parse_reply(stdout: &[u8]) -> Result<BackendReply> {
    let value: Value = serde_json::from_slice(stdout)
        .map_err(|e| ProxyError::Protocol(format!("adapter stdout is not valid JSON: {}", e)))?;

    match value.get("text").and_then(Value::as_str) {
        Some(text) => Ok(BackendReply { text: text.to_string() }),
        None => Err(ProxyError::Protocol(format!(
            "adapter output has no string `text` field: {}",
            value
        ))),
    }
}

///
/// Classify a non-zero adapter exit.
///
/// A well-formed `{error:{message,type}}` document on stderr is a
/// backend-reported failure and passes through verbatim. Anything else is
/// synthesized into an invocation failure that keeps the exit code and the
/// raw stderr text, so diagnostics are never discarded.
///
/// # Arguments
///  * `code` - exit code, None when the child died to a signal
///  * `stderr` - complete stderr contents
///
/// # Returns
///  * The matching `ProxyError` variant
fn classify_failure(code: Option<i32>, stderr: &str) -> ProxyError {
    if let Ok(value) = serde_json::from_str::<Value>(stderr) {
        if let Some(error) = value.get("error") {
            let message = error.get("message").and_then(Value::as_str);
            let error_type = error.get("type").and_then(Value::as_str);
            if let (Some(message), Some(error_type)) = (message, error_type) {
                return ProxyError::BackendReported {
                    message: message.to_string(),
                    error_type: error_type.to_string(),
                };
            }
        }
    }

    let stderr = stderr.trim();
    match code {
        Some(code) => {
            ProxyError::Invocation(format!("adapter exited with code {}: {}", code, stderr))
        }
        None => ProxyError::Invocation(format!("adapter was terminated by a signal: {}", stderr)),
    }
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::LogLevel;

    fn config_with_credentials(psid: Option<&str>, psidts: Option<&str>) -> Config {
        Config {
            psid: psid.map(str::to_string),
            psidts: psidts.map(str::to_string),
            port: 3000,
            log_level: LogLevel::Info,
            backend_timeout_secs: 300,
        }
    }

    fn sample_request() -> ChatRequest {
        ChatRequest {
            model: "gemini-2.0-flash".to_string(),
            messages: vec![json!({"role": "user", "content": "hi"})],
            stream: false,
        }
    }

    #[test]
    fn test_command_serializes_adapter_contract() {
        let config = config_with_credentials(Some("psid-value"), Some("psidts-value"));
        let command = BackendCommand::from_request(&config, &sample_request()).unwrap();

        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(value["psid"], "psid-value");
        assert_eq!(value["psidts"], "psidts-value");
        assert_eq!(value["model"], "gemini-2.0-flash");
        assert_eq!(value["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_command_passes_absent_psidts_as_null() {
        let config = config_with_credentials(Some("psid-value"), None);
        let command = BackendCommand::from_request(&config, &sample_request()).unwrap();

        let value = serde_json::to_value(&command).unwrap();
        assert!(value.as_object().unwrap().contains_key("psidts"));
        assert!(value["psidts"].is_null());
    }

    #[test]
    fn test_missing_psid_is_a_configuration_fault() {
        let config = config_with_credentials(None, None);
        let err = BackendCommand::from_request(&config, &sample_request()).unwrap_err();
        assert!(matches!(err, ProxyError::Config(_)));
    }

    #[test]
    fn test_parse_reply_accepts_text_and_ignores_extras() {
        // The real adapter also emits success/model_used next to text.
        let stdout = br#"{"success": true, "text": "hello there", "model_used": "g"}"#;
        let reply = parse_reply(stdout).unwrap();
        assert_eq!(reply.text, "hello there");
    }

    #[test]
    fn test_parse_reply_rejects_non_string_text() {
        let err = parse_reply(br#"{"text": 123}"#).unwrap_err();
        assert!(matches!(err, ProxyError::Protocol(_)));
    }

    #[test]
    fn test_parse_reply_rejects_missing_text() {
        let err = parse_reply(br#"{"success": true}"#).unwrap_err();
        assert!(matches!(err, ProxyError::Protocol(_)));
    }

    #[test]
    fn test_parse_reply_rejects_non_json_output() {
        let err = parse_reply(b"Traceback (most recent call last):").unwrap_err();
        assert!(matches!(err, ProxyError::Protocol(_)));
    }

    #[test]
    fn test_structured_stderr_passes_through_verbatim() {
        let stderr = r#"{"success": false, "error": {"message": "bad cred", "type": "auth_error"}}"#;
        match classify_failure(Some(1), stderr) {
            ProxyError::BackendReported { message, error_type } => {
                assert_eq!(message, "bad cred");
                assert_eq!(error_type, "auth_error");
            }
            other => panic!("expected BackendReported, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_stderr_keeps_code_and_text() {
        match classify_failure(Some(7), "python3: command crashed\n") {
            ProxyError::Invocation(message) => {
                assert!(message.contains('7'));
                assert!(message.contains("command crashed"));
            }
            other => panic!("expected Invocation, got {:?}", other),
        }
    }

    #[test]
    fn test_structured_stderr_with_missing_fields_is_synthesized() {
        // error object present but incomplete: still not forwardable as-is
        match classify_failure(Some(1), r#"{"error": {"message": "half"}}"#) {
            ProxyError::Invocation(message) => assert!(message.contains("half")),
            other => panic!("expected Invocation, got {:?}", other),
        }
    }

    #[test]
    fn test_signal_death_is_reported() {
        match classify_failure(None, "") {
            ProxyError::Invocation(message) => assert!(message.contains("signal")),
            other => panic!("expected Invocation, got {:?}", other),
        }
    }
}
