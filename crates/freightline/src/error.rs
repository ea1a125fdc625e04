//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use freightline_config::ConfigError;
use freightline_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the Freightline backend at {url}")]
    #[diagnostic(
        code(freightline::connection_failed),
        help(
            "Check the api_url in your profile and that the backend is reachable.\n\
             Use --insecure (-k) for development backends with self-signed certificates."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(freightline::auth_failed),
        help(
            "The session token was rejected or has expired.\n\
             Store a fresh one with: freightline config set-token --profile {profile}"
        )
    )]
    AuthFailed { profile: String },

    #[error("No session token configured for profile '{profile}'")]
    #[diagnostic(
        code(freightline::no_token),
        help(
            "Pass --token, set FREIGHTLINE_TOKEN, or run: freightline config set-token"
        )
    )]
    NoToken { profile: String },

    #[error("Permission denied: {message}")]
    #[diagnostic(code(freightline::forbidden))]
    Forbidden { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Notification '{identifier}' not found")]
    #[diagnostic(
        code(freightline::not_found),
        help("Run: freightline notifications list")
    )]
    NotFound { identifier: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(freightline::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(freightline::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(freightline::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Add one to {path}"
        )
    )]
    ProfileNotFound {
        name: String,
        available: String,
        path: String,
    },

    #[error("No backend configured")]
    #[diagnostic(
        code(freightline::no_config),
        help(
            "Pass --api-url, or add a profile to the config file.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(freightline::config))]
    Config(Box<ConfigError>),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out")]
    #[diagnostic(
        code(freightline::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    Timeout,

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(freightline::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoToken { .. } => exit_code::AUTH,
            Self::Forbidden { .. } => exit_code::PERMISSION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::AuthenticationFailed { message: _ } | CoreError::NotSignedIn => {
                CliError::AuthFailed {
                    profile: "current".into(),
                }
            }

            CoreError::Timeout => CliError::Timeout,

            CoreError::NotificationNotFound { identifier } => CliError::NotFound { identifier },

            CoreError::Api {
                message,
                status: Some(403),
            } => CliError::Forbidden { message },

            CoreError::Api { message, status } => CliError::ApiError {
                message: status.map_or_else(|| message.clone(), |s| format!("HTTP {s}: {message}")),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoToken { profile } => CliError::NoToken { profile },
            other => CliError::Config(Box::new(other)),
        }
    }
}
