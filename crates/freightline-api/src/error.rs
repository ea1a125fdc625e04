use thiserror::Error;

/// Top-level error type for the `freightline-api` crate.
///
/// Covers every failure mode of the notification endpoints: authentication,
/// transport, REST responses, and the push WebSocket.
/// `freightline-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Bearer token rejected (expired, revoked, or never valid).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Authenticated, but not allowed to touch this resource.
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── REST ────────────────────────────────────────────────────────
    /// Non-success status from a REST endpoint.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// An open WebSocket failed mid-stream (reset, protocol error).
    #[error("WebSocket connection dropped: {0}")]
    WebSocketDropped(String),

    /// WebSocket closed unexpectedly.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the session token is no longer accepted and
    /// signing in again might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status >= 500,
            Self::WebSocketConnect(_)
            | Self::WebSocketDropped(_)
            | Self::WebSocketClosed { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }
}
