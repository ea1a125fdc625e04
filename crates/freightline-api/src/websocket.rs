//! WebSocket push transport.
//!
//! Dials the backend's notification WebSocket with the session's bearer
//! token and yields parsed [`PushEvent`]s. One [`WsTransport::connect`] call
//! is one connection: there is no reconnect loop in here.
//!
//! # Example
//!
//! ```rust,ignore
//! use freightline_api::{PushConnection, PushTransport, WsTransport};
//! use url::Url;
//!
//! let transport = WsTransport::new(Url::parse("wss://api.example.com/ws/notifications")?);
//! let mut conn = transport.connect(&token).await?;
//!
//! while let Some(Ok(event)) = conn.next_event().await {
//!     println!("{event:?}");
//! }
//!
//! conn.close().await;
//! ```

use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::Error;
use crate::models::PushEvent;
use crate::push::{PushConnection, PushTransport};

// ── WsTransport ──────────────────────────────────────────────────────

/// Push transport backed by `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WsTransport {
    ws_url: Url,
}

impl WsTransport {
    pub fn new(ws_url: Url) -> Self {
        Self { ws_url }
    }

    pub fn url(&self) -> &Url {
        &self.ws_url
    }
}

impl PushTransport for WsTransport {
    type Connection = WsConnection;

    async fn connect(&self, token: &SecretString) -> Result<WsConnection, Error> {
        tracing::info!(url = %self.ws_url, "Connecting to WebSocket");

        let uri: tungstenite::http::Uri = self.ws_url.as_str().parse().map_err(
            |e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()),
        )?;

        let request = ClientRequestBuilder::new(uri).with_header(
            "Authorization",
            format!("Bearer {}", token.expose_secret()),
        );

        let (stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

        tracing::info!("WebSocket connected");
        Ok(WsConnection {
            stream,
            closed: false,
        })
    }
}

// ── WsConnection ─────────────────────────────────────────────────────

/// A single open WebSocket connection.
pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

impl PushConnection for WsConnection {
    async fn next_event(&mut self) -> Option<Result<PushEvent, Error>> {
        if self.closed {
            return None;
        }

        loop {
            match self.stream.next().await {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    if let Some(event) = parse_frame(&text) {
                        return Some(Ok(event));
                    }
                }
                Some(Ok(tungstenite::Message::Ping(_))) => {
                    // tungstenite handles pong replies automatically
                    tracing::trace!("WebSocket ping");
                }
                Some(Ok(tungstenite::Message::Close(frame))) => {
                    self.closed = true;
                    return match frame {
                        Some(cf) if cf.code != CloseCode::Normal && cf.code != CloseCode::Away => {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "WebSocket close frame received"
                            );
                            Some(Err(Error::WebSocketClosed {
                                code: u16::from(cf.code),
                                reason: cf.reason.to_string(),
                            }))
                        }
                        _ => {
                            tracing::info!("WebSocket closed by server");
                            None
                        }
                    };
                }
                Some(Err(e)) => {
                    self.closed = true;
                    return Some(Err(stream_error(&e)));
                }
                None => {
                    // Stream ended without a close frame
                    tracing::info!("WebSocket stream ended");
                    self.closed = true;
                    return None;
                }
                Some(Ok(_)) => {
                    // Binary, Pong, Frame -- ignore
                }
            }
        }
    }

    async fn close(mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "WebSocket close handshake failed");
        }
    }
}

/// An error on an already-open stream is a drop, not a failed handshake.
fn stream_error(e: &tungstenite::Error) -> Error {
    tracing::info!(error = %e, "WebSocket stream error");
    Error::WebSocketDropped(e.to_string())
}

// ── Frame parsing ────────────────────────────────────────────────────

/// Parse a text frame into a [`PushEvent`].
///
/// Malformed frames and event types this client does not know are
/// logged and skipped rather than tearing down the connection.
pub(crate) fn parse_frame(text: &str) -> Option<PushEvent> {
    match serde_json::from_str::<PushEvent>(text) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::debug!(error = %e, "Skipping unrecognised push frame");
            None
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
