// ── Core error types ──
//
// User-facing errors from freightline-core. These are NOT API-specific --
// consumers never see HTTP status codes or JSON parse failures directly.
// The `From<freightline_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
///
/// Nothing here is fatal to the host: connection errors only ever surface
/// as `ConnectionState::Disconnected`, fetch errors land in the store's
/// `error` field, and mutation errors are returned for the caller to show.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("No signed-in session")]
    NotSignedIn,

    #[error("Request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Notification not found: {identifier}")]
    NotificationNotFound { identifier: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<freightline_api::Error> for CoreError {
    fn from(err: freightline_api::Error) -> Self {
        use freightline_api::Error as ApiError;

        match err {
            ApiError::Authentication { message } => CoreError::AuthenticationFailed { message },
            ApiError::Forbidden { message } => CoreError::Api {
                message,
                status: Some(403),
            },
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ApiError::Api { status: 404, message } => CoreError::NotificationNotFound {
                identifier: message,
            },
            ApiError::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            ApiError::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            ApiError::WebSocketDropped(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection dropped: {reason}"),
            },
            ApiError::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket closed (code {code}): {reason}"),
            },
            ApiError::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
