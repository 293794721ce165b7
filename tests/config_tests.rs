//! Configuration module tests
//!
//! Tests for configuration loading, validation, and parsing from environment variables.
//!
//! Uses temp-env to safely manage environment variables during tests, automatically
//! restoring them after each test completes.

use geminimux::config::{Config, LogLevel, ValidationSeverity};
use temp_env::with_vars;

/// Test that configuration loads with defaults when nothing is set
#[test]
fn test_defaults() {
    // Skip this test if .env file exists, as dotenv() will load vars from it
    if std::path::Path::new(".env").exists() {
        eprintln!("Skipping test_defaults: .env file exists");
        return;
    }

    with_vars(
        vec![
            ("GEMINI_PSID", None::<&str>),
            ("GEMINI_PSIDTS", None::<&str>),
            ("PORT", None::<&str>),
            ("LOG_LEVEL", None::<&str>),
            ("BACKEND_TIMEOUT_SECS", None::<&str>),
        ],
        || {
            let config = Config::from_env().expect("Should load config with defaults");
            assert_eq!(config.psid, None, "Credentials default to absent");
            assert_eq!(config.psidts, None);
            assert_eq!(config.port, 3000, "Default port should be 3000");
            assert_eq!(config.log_level, LogLevel::Info, "Default log level should be Info");
            assert_eq!(config.backend_timeout_secs, 300, "Default deadline should be 300s");
        },
    );
}

/// Test that credentials are loaded and trimmed
#[test]
fn test_credentials_are_loaded() {
    with_vars(
        vec![
            ("GEMINI_PSID", Some(" psid-value ")),
            ("GEMINI_PSIDTS", Some("psidts-value")),
        ],
        || {
            let config = Config::from_env().expect("Should load config");
            assert_eq!(config.psid.as_deref(), Some("psid-value"), "Value should be trimmed");
            assert_eq!(config.psidts.as_deref(), Some("psidts-value"));
        },
    );
}

/// Test that empty credential values count as absent
#[test]
fn test_empty_credentials_are_absent() {
    with_vars(
        vec![("GEMINI_PSID", Some("")), ("GEMINI_PSIDTS", Some("   "))],
        || {
            let config = Config::from_env().expect("Should load config");
            assert_eq!(config.psid, None, "Empty credential should be treated as absent");
            assert_eq!(config.psidts, None, "Whitespace credential should be treated as absent");
        },
    );
}

/// Test that custom port is parsed correctly
#[test]
fn test_custom_port() {
    with_vars(vec![("PORT", Some("8080"))], || {
        let config = Config::from_env().expect("Should load config");
        assert_eq!(config.port, 8080, "Should use custom port");
    });
}

/// Test that invalid port produces error
#[test]
fn test_invalid_port() {
    with_vars(vec![("PORT", Some("99999"))], || {
        let result = Config::from_env();
        assert!(result.is_err(), "Should fail with invalid port");
    });
}

/// Test log level parsing
#[test]
fn test_log_level_parsing() {
    let levels = vec!["trace", "debug", "info", "warn", "error"];
    for level in levels {
        with_vars(vec![("LOG_LEVEL", Some(level))], || {
            let config = Config::from_env().expect("Should load config");
            assert_eq!(
                format!("{:?}", config.log_level).to_lowercase(),
                level,
                "Should parse log level correctly"
            );
        });
    }
}

/// Test custom adapter deadline parsing
#[test]
fn test_custom_backend_timeout() {
    with_vars(vec![("BACKEND_TIMEOUT_SECS", Some("60"))], || {
        let config = Config::from_env().expect("Should load config");
        assert_eq!(config.backend_timeout_secs, 60);
    });
}

/// Test that a zero deadline is accepted (unbounded wait)
#[test]
fn test_zero_backend_timeout() {
    with_vars(vec![("BACKEND_TIMEOUT_SECS", Some("0"))], || {
        let config = Config::from_env().expect("Should load config");
        assert_eq!(config.backend_timeout_secs, 0);
    });
}

/// Test that a non-numeric deadline produces error
#[test]
fn test_invalid_backend_timeout() {
    with_vars(vec![("BACKEND_TIMEOUT_SECS", Some("soon"))], || {
        let result = Config::from_env();
        assert!(result.is_err(), "Should fail with non-numeric deadline");
    });
}

/// Test that validation flags a missing primary credential as an error
#[test]
fn test_validation_missing_psid() {
    // Skip this test if .env file exists, as dotenv() will load vars from it
    if std::path::Path::new(".env").exists() {
        eprintln!("Skipping test_validation_missing_psid: .env file exists");
        return;
    }

    with_vars(
        vec![("GEMINI_PSID", None::<&str>), ("GEMINI_PSIDTS", None::<&str>)],
        || {
            let config = Config::from_env().expect("Should load config");
            let issues = config.validate();
            assert!(
                issues
                    .iter()
                    .any(|i| i.field == "GEMINI_PSID" && i.severity == ValidationSeverity::Error),
                "Should flag missing primary credential"
            );
        },
    );
}

/// Test that a fully configured environment validates without errors
#[test]
fn test_validation_complete_environment() {
    with_vars(
        vec![
            ("GEMINI_PSID", Some("psid-value")),
            ("GEMINI_PSIDTS", Some("psidts-value")),
            ("PORT", Some("3000")),
            ("BACKEND_TIMEOUT_SECS", Some("300")),
        ],
        || {
            let config = Config::from_env().expect("Should load config");
            let errors: Vec<_> = config
                .validate()
                .into_iter()
                .filter(|i| i.severity == ValidationSeverity::Error)
                .collect();
            assert!(errors.is_empty(), "Complete environment should have no errors: {:?}", errors);
        },
    );
}
