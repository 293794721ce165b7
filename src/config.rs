//!
//! Configuration management for the OpenAI-compatible Gemini proxy server.
//!
//! Handles loading configuration from environment variables with sensible defaults.
//! Follows Single Responsibility Principle - manages all configuration concerns.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::env;

use crate::error::{ProxyError, Result};

/* --- types ----------------------------------------------------------------------------------- */

///
/// Application configuration structure.
///
/// Loaded once at startup and never mutated afterwards; handlers read it
/// through shared state. The session credentials are intentionally optional
/// at load time: the server boots without them and every chat request fails
/// with a configuration error until `GEMINI_PSID` is provided.
#[derive(Debug, Clone)]
pub struct Config {
    /** primary Gemini session credential (__Secure-1PSID cookie value) */
    pub psid: Option<String>,
    /** secondary Gemini session credential (__Secure-1PSIDTS cookie value) */
    pub psidts: Option<String>,
    /** HTTP server port number */
    pub port: u16,
    /** application logging level */
    pub log_level: LogLevel,
    /** deadline for one adapter invocation in seconds, 0 disables */
    pub backend_timeout_secs: u64,
}

///
/// Logging level enumeration.
///
/// Defines available log levels with helper methods for level checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

///
/// Configuration validation issue.
///
/// Represents a single validation problem found during configuration check.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Configuration field name
    pub field: String,
    /// Severity of the issue
    pub severity: ValidationSeverity,
    /// Description of the issue
    pub message: String,
    /// Optional suggestion for fixing the issue
    pub suggestion: Option<String>,
}

///
/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Error - configuration is invalid and will cause failures
    Error,
    /// Warning - configuration may work but has potential issues
    Warning,
    /// Info - informational note about configuration
    Info,
}

/* --- constants ------------------------------------------------------------------------------ */

/** default adapter invocation deadline in seconds */
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 300;

/* --- start of code -------------------------------------------------------------------------- */

impl LogLevel {
    ///
    /// Check if trace-level logging is enabled.
    ///
    /// Returns true for Trace and Debug levels, which enable detailed logging
    /// of adapter payloads and request handling.
    ///
    /// # Returns
    ///  * `true` if trace logging should be enabled
    ///  * `false` otherwise
    pub fn is_trace_enabled(self) -> bool {
        matches!(self, LogLevel::Trace | LogLevel::Debug)
    }
}

impl From<&str> for LogLevel {
    ///
    /// Convert string representation to LogLevel enum.
    ///
    /// Case-insensitive conversion with Info as the default fallback.
    ///
    /// # Arguments
    ///  * `s` - string representation of log level
    ///
    /// # Returns
    ///  * Corresponding LogLevel enum value
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

impl Config {
    ///
    /// Load configuration from environment variables.
    ///
    /// Attempts to load .env file if present, then reads configuration from
    /// environment variables with sensible defaults. Missing credentials do
    /// not fail the load; they fail individual requests instead, so `doctor`
    /// and `validate` can still run against a partial environment.
    ///
    /// # Returns
    ///  * Configuration object with all settings loaded
    ///  * `ProxyError::Config` if a present variable has an invalid value
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let psid = Self::get_credential("GEMINI_PSID");
        let psidts = Self::get_credential("GEMINI_PSIDTS");
        let port = Self::get_port()?;
        let log_level = Self::get_log_level();
        let backend_timeout_secs = Self::get_backend_timeout_secs()?;

        Ok(Config { psid, psidts, port, log_level, backend_timeout_secs })
    }

    ///
    /// Read an optional credential variable, normalizing empty values.
    ///
    /// A variable that is unset, empty, or whitespace-only is treated as
    /// absent so downstream code has a single "not configured" state.
    ///
    /// # Arguments
    ///  * `name` - environment variable name
    ///
    /// # Returns
    ///  * The trimmed credential value, or None when not configured
    fn get_credential(name: &str) -> Option<String> {
        env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    ///
    /// Get the server port from environment or use default.
    ///
    /// # Returns
    ///  * Port number as u16
    ///  * `ProxyError::Config` if port value is invalid
    fn get_port() -> Result<u16> {
        env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| {
                ProxyError::Config(format!(
                    "Invalid PORT value: {}\n\
         \n\
         PORT must be a number between 1 and 65535.\n\
            Example: export PORT=3000\n\
         \n\
         Run 'geminimux doctor' for more help.",
                    e
                ))
            })
    }

    ///
    /// Get the log level from environment or use default.
    ///
    /// # Returns
    ///  * LogLevel enum value
    fn get_log_level() -> LogLevel {
        let log_level_str = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        LogLevel::from(log_level_str.as_str())
    }

    ///
    /// Get the adapter invocation deadline from environment or use default.
    ///
    /// A value of 0 disables the deadline entirely, restoring an unbounded
    /// wait on the child process.
    ///
    /// # Returns
    ///  * Deadline in seconds
    ///  * `ProxyError::Config` if the value is not a number
    fn get_backend_timeout_secs() -> Result<u64> {
        env::var("BACKEND_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_BACKEND_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|e| {
                ProxyError::Config(format!(
                    "Invalid BACKEND_TIMEOUT_SECS value: {}\n\
         \n\
         BACKEND_TIMEOUT_SECS must be a number of seconds (0 disables the deadline).\n\
            Example: export BACKEND_TIMEOUT_SECS=300\n\
         \n\
         Run 'geminimux doctor' for more help.",
                    e
                ))
            })
    }

    ///
    /// Validate configuration and return detailed validation results.
    ///
    /// Checks all configuration values for correctness and provides helpful
    /// suggestions for any issues found.
    ///
    /// # Returns
    ///  * Vector of validation issues (empty if all valid)
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.psid.is_none() {
            issues.push(ValidationIssue {
                field: "GEMINI_PSID".to_string(),
                severity: ValidationSeverity::Error,
                message: "Primary session credential is not set; every chat request will fail"
                    .to_string(),
                suggestion: Some(
                    "Copy the __Secure-1PSID cookie from an authenticated Gemini browser session \
                     and export GEMINI_PSID=\"<value>\""
                        .to_string(),
                ),
            });
        }

        if self.psidts.is_none() {
            issues.push(ValidationIssue {
                field: "GEMINI_PSIDTS".to_string(),
                severity: ValidationSeverity::Info,
                message: "Secondary session credential is not set".to_string(),
                suggestion: Some(
                    "Some accounts also require the __Secure-1PSIDTS cookie; set GEMINI_PSIDTS \
                     if backend calls fail with authentication errors"
                        .to_string(),
                ),
            });
        }

        // Validate port range
        // Note: port is u16, so max value is 65535 (enforced by type system)
        if self.port == 0 {
            issues.push(ValidationIssue {
                field: "PORT".to_string(),
                severity: ValidationSeverity::Error,
                message: "Port cannot be 0".to_string(),
                suggestion: Some("Use a valid port number between 1 and 65535".to_string()),
            });
        }

        if self.backend_timeout_secs == 0 {
            issues.push(ValidationIssue {
                field: "BACKEND_TIMEOUT_SECS".to_string(),
                severity: ValidationSeverity::Warning,
                message: "Adapter deadline is disabled; a hung adapter hangs its request forever"
                    .to_string(),
                suggestion: Some("Set BACKEND_TIMEOUT_SECS to a value > 0".to_string()),
            });
        } else if self.backend_timeout_secs > 3600 {
            issues.push(ValidationIssue {
                field: "BACKEND_TIMEOUT_SECS".to_string(),
                severity: ValidationSeverity::Warning,
                message: format!(
                    "BACKEND_TIMEOUT_SECS ({}) is very high",
                    self.backend_timeout_secs
                ),
                suggestion: Some("Consider a value in the 60-600 range".to_string()),
            });
        }

        issues
    }
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            psid: Some("psid-value".to_string()),
            psidts: Some("psidts-value".to_string()),
            port: 3000,
            log_level: LogLevel::Info,
            backend_timeout_secs: 300,
        }
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::from("trace"), LogLevel::Trace);
        assert_eq!(LogLevel::from("TRACE"), LogLevel::Trace); // Case insensitive
        assert_eq!(LogLevel::from("debug"), LogLevel::Debug);
        assert_eq!(LogLevel::from("info"), LogLevel::Info);
        assert_eq!(LogLevel::from("warn"), LogLevel::Warn);
        assert_eq!(LogLevel::from("error"), LogLevel::Error);
        assert_eq!(LogLevel::from("unknown"), LogLevel::Info); // Default
    }

    #[test]
    fn test_log_level_trace_enabled() {
        assert!(LogLevel::Trace.is_trace_enabled());
        assert!(LogLevel::Debug.is_trace_enabled());
        assert!(!LogLevel::Info.is_trace_enabled());
        assert!(!LogLevel::Warn.is_trace_enabled());
        assert!(!LogLevel::Error.is_trace_enabled());
    }

    #[test]
    fn test_validation_clean_config() {
        let issues = base_config().validate();
        assert!(
            issues.iter().all(|i| i.severity != ValidationSeverity::Error),
            "fully populated config should have no errors, got: {:?}",
            issues
        );
    }

    #[test]
    fn test_validation_missing_psid_is_error() {
        let config = Config { psid: None, ..base_config() };
        let issues = config.validate();
        assert!(
            issues
                .iter()
                .any(|i| i.field == "GEMINI_PSID" && i.severity == ValidationSeverity::Error),
            "missing primary credential should be an error"
        );
    }

    #[test]
    fn test_validation_missing_psidts_is_info() {
        let config = Config { psidts: None, ..base_config() };
        let issues = config.validate();
        assert!(
            issues
                .iter()
                .any(|i| i.field == "GEMINI_PSIDTS" && i.severity == ValidationSeverity::Info),
            "missing secondary credential should only be informational"
        );
    }

    #[test]
    fn test_validation_zero_port_is_error() {
        let config = Config { port: 0, ..base_config() };
        let issues = config.validate();
        assert!(
            issues.iter().any(|i| i.field == "PORT" && i.severity == ValidationSeverity::Error),
            "port 0 should be an error"
        );
    }

    #[test]
    fn test_validation_disabled_deadline_warns() {
        let config = Config { backend_timeout_secs: 0, ..base_config() };
        let issues = config.validate();
        assert!(
            issues.iter().any(|i| i.field == "BACKEND_TIMEOUT_SECS"
                && i.severity == ValidationSeverity::Warning),
            "disabled deadline should warn"
        );
    }
}
