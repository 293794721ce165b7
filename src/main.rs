//! # GeminiMux - Gemini Session to OpenAI Proxy Server
//!
//! A proxy server that exposes an OpenAI-compatible chat completions API and
//! fulfils each request from a credential-based Gemini web session, driven
//! through a one-shot adapter subprocess. Built with Rust following SOLID
//! principles for type safety, performance, and reliability.
//!
//! ## Features
//!
//! - **OpenAI-compatible API**: Drop-in replacement for the chat completions endpoint
//! - **Simulated Streaming**: Server-Sent Events (SSE) responses re-chunked from one reply
//! - **Subprocess Backend**: JSON-over-stdio adapter contract, one process per request
//! - **Error Handling**: Comprehensive error handling with proper Result types
//! - **Type Safety**: Leverages Rust's type system for compile-time safety
//! - **Performance**: Async/await with Tokio for high concurrency
//! - **Configurable Logging**: Structured logging with tracing
//!
//! ## Configuration
//!
//! Configure the server using environment variables:
//!
//! ```bash
//! # Required for backend calls: primary Gemini session credential
//! export GEMINI_PSID="your-__Secure-1PSID-cookie-value"
//!
//! # Optional: secondary session credential
//! export GEMINI_PSIDTS="your-__Secure-1PSIDTS-cookie-value"
//!
//! # Optional: server configuration
//! export PORT=3000
//! export LOG_LEVEL=info
//! export BACKEND_TIMEOUT_SECS=300
//! ```
//!
//! ## API Usage
//!
//! The server provides an OpenAI-compatible endpoint:
//!
//! ```bash
//! curl -X POST http://localhost:3000/v1/chat/completions \
//!   -H "Content-Type: application/json" \
//!   -d '{
//!     "model": "gemini-2.0-flash",
//!     "messages": [{"role": "user", "content": "Hello!"}],
//!     "stream": false
//!   }'
//! ```
//!
//! ## License
//!
//! Licensed under either of Apache License, Version 2.0 or MIT license at your option.
//!
//! Authors: Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp
//!

/* --- uses ------------------------------------------------------------------------------------ */

use std::env;

use axum::Router;
use tracing::{Level, info};

use geminimux::config::{self, Config};
use geminimux::error::Result;

/* --- constants ------------------------------------------------------------------------------ */

/** the version as defined in cargo.toml */
const VERSION: &str = env!("CARGO_PKG_VERSION");

/* --- start of code -------------------------------------------------------------------------- */

///
/// Main application entry point for the GeminiMux proxy server.
///
/// Initializes logging, loads configuration from environment variables,
/// creates the application, and starts the HTTP server with proper
/// routing and middleware.
#[tokio::main]
async fn main() {
    // Handle CLI arguments before config loading
    handle_cli_args();

    if let Err(e) = run().await {
        // Print error message line by line to ensure proper formatting
        let error_msg = format!("{}", e);
        eprintln!("Error:");
        for line in error_msg.lines() {
            eprintln!("{}", line);
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env()?;
    initialize_logging(&config);

    if config.psid.is_none() {
        tracing::warn!(
            "GEMINI_PSID is not set - chat requests will fail until it is configured"
        );
    }

    let app = geminimux::create_app(config.clone());

    start_server(&config, app).await
}

///
/// Handle command line arguments like --version and --help before config loading.
///
/// This ensures these commands work even without proper configuration.
fn handle_cli_args() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        return; // No arguments, proceed with normal startup
    }

    match args[1].as_str() {
        "--version" | "-V" => {
            println!("geminimux {}", VERSION);
            std::process::exit(0);
        }
        "--help" | "-h" => {
            print_help();
            std::process::exit(0);
        }
        "doctor" => {
            run_doctor();
            std::process::exit(0);
        }
        "validate" => {
            let exit_code = run_validate();
            std::process::exit(exit_code);
        }
        _ => {
            // Unknown command or option - show error and help
            if args[1].starts_with('-') {
                eprintln!("Error: Unknown option: {}", args[1]);
                eprintln!();
                print_help();
                std::process::exit(1);
            } else {
                eprintln!("Error: Unknown command: {}", args[1]);
                eprintln!();
                eprintln!("Available commands:");
                eprintln!("  doctor    - Run configuration health check");
                eprintln!("  validate  - Validate configuration");
                eprintln!();
                eprintln!("Available options:");
                eprintln!("  --version, -V  - Show version");
                eprintln!("  --help, -h     - Show help");
                eprintln!();
                eprintln!("Run 'geminimux --help' for more information.");
                std::process::exit(1);
            }
        }
    }
}

///
/// Print help information for the GeminiMux CLI.
fn print_help() {
    println!("GeminiMux v{}", VERSION);
    println!("Proxy server serving OpenAI-compatible chat completions from a Gemini web session");
    println!();
    println!("USAGE:");
    println!("    geminimux [COMMAND] [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    doctor              Check configuration and system health");
    println!("    validate            Validate configuration and exit");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help          Print help information");
    println!("    -V, --version       Print version information");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    GEMINI_PSID               Primary Gemini session credential (required for requests)");
    println!("    GEMINI_PSIDTS             Secondary Gemini session credential (optional)");
    println!("    PORT                      Server port (default: 3000)");
    println!(
        "    LOG_LEVEL                 Log level: trace, debug, info, warn, error (default: info)"
    );
    println!(
        "    BACKEND_TIMEOUT_SECS      Adapter deadline in seconds, 0 disables (default: 300)"
    );
    println!();
    println!("EXAMPLES:");
    println!("    geminimux                   Start the proxy server");
    println!("    geminimux doctor            Check configuration");
    println!("    geminimux validate          Validate and exit");
    println!();
    println!("For more information, visit: https://github.com/yarenty/geminimux");
}

///
/// Run the doctor command to check configuration and system health.
///
/// Performs comprehensive checks and provides helpful diagnostics.
fn run_doctor() {
    // Load .env file first so we can check actual environment variables
    let _ = dotenvy::dotenv();

    println!("GeminiMux Doctor - Configuration Health Check");
    println!("{}", "=".repeat(60));
    println!();

    // Check for .env file
    let env_file_exists = std::path::Path::new(".env").exists();
    if env_file_exists {
        println!("[OK] Found .env file");
    } else {
        println!("[INFO] No .env file found (using environment variables)");
    }
    println!();

    // Check credential variables without ever printing their values
    println!("Checking Session Credentials:");
    report_credential("GEMINI_PSID", true);
    report_credential("GEMINI_PSIDTS", false);
    println!();

    // Check the adapter script the backend will spawn
    println!("Checking Backend Adapter:");
    if std::path::Path::new(geminimux::backend::ADAPTER_SCRIPT).exists() {
        println!("  [OK] Adapter script found: {}", geminimux::backend::ADAPTER_SCRIPT);
    } else {
        println!(
            "  [ERROR] Adapter script not found: {} (run the server from the \
             repository root, or install the adapter)",
            geminimux::backend::ADAPTER_SCRIPT
        );
    }
    println!();

    // Try to load and validate config
    println!("Configuration Validation:");
    match Config::from_env() {
        Ok(config) => {
            println!("  [OK] Configuration loaded successfully");
            println!();

            let issues = config.validate();
            if issues.is_empty() {
                println!("  [OK] No validation issues found");
                println!();
                println!("[SUCCESS] Configuration looks good! You're ready to run GeminiMux.");
            } else {
                report_issues(&issues);
            }
        }
        Err(e) => {
            println!("  [ERROR] Failed to load configuration:");
            println!("     {}", e);
        }
    }
}

///
/// Report one credential variable, masking its value.
///
/// Only presence and length are printed; session credentials never appear
/// in terminal output.
fn report_credential(name: &str, required: bool) {
    match env::var(name) {
        Ok(val) if !val.trim().is_empty() => {
            println!("  [OK] {}: set ({} chars)", name, val.trim().len());
        }
        Ok(_) => {
            let tag = if required { "ERROR" } else { "INFO" };
            println!("  [{}] {}: Set but empty", tag, name);
        }
        Err(_) => {
            let tag = if required { "ERROR" } else { "INFO" };
            println!("  [{}] {}: Not set", tag, name);
        }
    }
}

///
/// Print validation issues grouped by severity.
fn report_issues(issues: &[config::ValidationIssue]) {
    let errors: Vec<_> =
        issues.iter().filter(|i| i.severity == config::ValidationSeverity::Error).collect();
    let warnings: Vec<_> =
        issues.iter().filter(|i| i.severity == config::ValidationSeverity::Warning).collect();
    let infos: Vec<_> =
        issues.iter().filter(|i| i.severity == config::ValidationSeverity::Info).collect();

    if !errors.is_empty() {
        println!("  [ERROR] Found {} error(s):", errors.len());
        for issue in &errors {
            println!("     • {}: {}", issue.field, issue.message);
            if let Some(suggestion) = &issue.suggestion {
                println!("       [TIP] {}", suggestion);
            }
        }
        println!();
    }

    if !warnings.is_empty() {
        println!("  [WARNING] Found {} warning(s):", warnings.len());
        for issue in &warnings {
            println!("     • {}: {}", issue.field, issue.message);
            if let Some(suggestion) = &issue.suggestion {
                println!("       [TIP] {}", suggestion);
            }
        }
        println!();
    }

    if !infos.is_empty() {
        println!("  [INFO] Found {} info message(s):", infos.len());
        for issue in &infos {
            println!("     • {}: {}", issue.field, issue.message);
            if let Some(suggestion) = &issue.suggestion {
                println!("       [TIP] {}", suggestion);
            }
        }
        println!();
    }

    if errors.is_empty() {
        println!("[SUCCESS] Configuration has warnings but should work. Review suggestions above.");
    } else {
        println!("[ERROR] Configuration has errors. Please fix them before running GeminiMux.");
    }
}

///
/// Run the validate command to validate configuration and exit.
///
/// Returns exit code 0 if valid, 1 if invalid.
fn run_validate() -> i32 {
    match Config::from_env() {
        Ok(config) => {
            let issues = config.validate();
            let errors: Vec<_> = issues
                .iter()
                .filter(|i| i.severity == config::ValidationSeverity::Error)
                .collect();

            if errors.is_empty() {
                println!("[OK] Configuration is valid");
                0
            } else {
                eprintln!("[ERROR] Configuration validation failed:");
                for issue in &errors {
                    eprintln!("  • {}: {}", issue.field, issue.message);
                    if let Some(suggestion) = &issue.suggestion {
                        eprintln!("    Suggestion: {}", suggestion);
                    }
                }
                1
            }
        }
        Err(e) => {
            eprintln!("[ERROR] Configuration error: {}", e);
            1
        }
    }
}

///
/// Initialize logging with the specified log level.
///
/// Sets up tracing subscriber with appropriate log level based on configuration.
///
/// # Arguments
///  * `config` - application configuration containing log level settings
fn initialize_logging(config: &Config) {
    let log_level = match config.log_level {
        config::LogLevel::Trace => Level::TRACE,
        config::LogLevel::Debug => Level::DEBUG,
        config::LogLevel::Info => Level::INFO,
        config::LogLevel::Warn => Level::WARN,
        config::LogLevel::Error => Level::ERROR,
    };

    tracing_subscriber::fmt().with_max_level(log_level).with_target(false).init();
}

///
/// Start the HTTP server and log startup information.
///
/// Binds to the configured port and starts serving requests. Logs important
/// information about the server configuration and available endpoints.
///
/// # Arguments
///  * `config` - application configuration
///  * `app` - configured Axum application
///
/// # Returns
///  * `Ok(())` when server shuts down gracefully
///  * `ProxyError::Http` if server binding or startup fails
async fn start_server(config: &Config, app: Router) -> Result<()> {
    let listener =
        tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await.map_err(|e| {
            let error_msg = format!("Failed to bind to port {}: {}", config.port, e);

            // "Address already in use" gets dedicated suggestions
            let error_str = e.to_string();
            if error_str.to_lowercase().contains("address already in use") {
                let suggestions = format!(
                    "{}\n\n\
                    Port {} is already in use. Here are some solutions:\n\n\
                    1. Close the other instance:\n\
                       • Find the process using port {}:\n\
                         lsof -i :{}\n\
                       • Kill the process:\n\
                         kill -9 <PID>\n\n\
                    2. Change the port:\n\
                       export PORT=3001\n\
                       geminimux\n\n\
                    Run 'geminimux doctor' for more help.",
                    error_msg, config.port, config.port, config.port
                );
                geminimux::error::ProxyError::Http(suggestions)
            } else {
                geminimux::error::ProxyError::Http(format!(
                    "{}\n\n\
                    To fix this:\n\
                    • Check if the port is valid (1-65535)\n\
                    • Ensure you have permission to bind to the port\n\
                    • Try a different port: export PORT=3001\n\n\
                    Run 'geminimux doctor' for more help.",
                    error_msg
                ))
            }
        })?;

    log_startup_info(config);

    axum::serve(listener, app)
        .await
        .map_err(|e| geminimux::error::ProxyError::Http(format!("Server error: {}", e)))?;

    Ok(())
}

///
/// Log startup information and configuration details.
///
/// Provides useful information about the running server including port
/// and endpoint locations.
///
/// # Arguments
///  * `config` - application configuration
fn log_startup_info(config: &Config) {
    info!("GeminiMux v{} running on port {}", VERSION, config.port);
    info!("OpenAI-compatible endpoint: http://localhost:{}/v1", config.port);

    if config.log_level.is_trace_enabled() {
        info!(
            "[TRACE] Trace logging is ENABLED (LOG_LEVEL={:?}) - adapter payloads and request \
       handling will be logged",
            config.log_level
        );
    }
}
