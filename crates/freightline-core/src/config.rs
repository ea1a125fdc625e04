// ── Runtime sync configuration ──
//
// These types describe *where* the notification endpoints live and how
// the sync layer behaves. They never touch disk: the CLI (or any host)
// builds a `SyncConfig` and hands it in.

use std::time::Duration;

use url::Url;

use crate::error::CoreError;
use crate::supervisor::ReconnectConfig;

/// Path of the push endpoint when no explicit WebSocket URL is configured.
const DEFAULT_PUSH_PATH: &str = "/ws/notifications";

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (local development backends).
    DangerAcceptInvalid,
}

/// Configuration for the notification sync layer.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// REST API root (e.g., `https://api.example.com/v1`).
    pub api_url: Url,
    /// Push WebSocket URL. Derived from `api_url` when `None`.
    pub ws_url: Option<Url>,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    /// How often to re-fetch the full snapshot while signed in (seconds). 0 = never.
    pub refresh_interval_secs: u64,
    /// Reconnect policy for dropped push connections. `None` = no retry.
    pub reconnect: Option<ReconnectConfig>,
    /// Open a push connection for the signed-in session. One-shot
    /// consumers that only fetch turn this off.
    pub push_enabled: bool,
}

impl SyncConfig {
    /// Defaults for everything but the API root.
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            ws_url: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            refresh_interval_secs: 0,
            reconnect: None,
            push_enabled: true,
        }
    }

    /// The push endpoint: `ws_url` if set, otherwise `api_url` with the
    /// scheme switched to `ws`/`wss` and the path replaced.
    pub fn push_url(&self) -> Result<Url, CoreError> {
        if let Some(ref url) = self.ws_url {
            return Ok(url.clone());
        }

        let scheme = match self.api_url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => {
                return Err(CoreError::Config {
                    message: format!("cannot derive push URL from '{other}' scheme"),
                });
            }
        };

        let mut url = self.api_url.clone();
        url.set_scheme(scheme).map_err(|()| CoreError::Config {
            message: format!("cannot derive push URL from {}", self.api_url),
        })?;
        url.set_path(DEFAULT_PUSH_PATH);
        url.set_query(None);
        Ok(url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn push_url_derived_from_https_api() {
        let config = SyncConfig::new(Url::parse("https://api.example.com/v1?x=1").unwrap());
        assert_eq!(
            config.push_url().unwrap().as_str(),
            "wss://api.example.com/ws/notifications"
        );
    }

    #[test]
    fn push_url_derived_from_http_api_keeps_port() {
        let config = SyncConfig::new(Url::parse("http://127.0.0.1:8080/api").unwrap());
        assert_eq!(
            config.push_url().unwrap().as_str(),
            "ws://127.0.0.1:8080/ws/notifications"
        );
    }

    #[test]
    fn explicit_push_url_wins() {
        let mut config = SyncConfig::new(Url::parse("https://api.example.com").unwrap());
        config.ws_url = Some(Url::parse("wss://push.example.com/live").unwrap());
        assert_eq!(config.push_url().unwrap().as_str(), "wss://push.example.com/live");
    }

    #[test]
    fn unsupported_scheme_is_config_error() {
        let config = SyncConfig::new(Url::parse("ftp://files.example.com").unwrap());
        assert!(matches!(config.push_url(), Err(CoreError::Config { .. })));
    }

    #[test]
    fn defaults_disable_refresh_and_retry() {
        let config = SyncConfig::new(Url::parse("https://api.example.com").unwrap());
        assert_eq!(config.refresh_interval_secs, 0);
        assert!(config.reconnect.is_none());
        assert!(config.push_enabled);
        assert_eq!(config.tls, TlsVerification::SystemDefaults);
    }
}
