// REST client for the notification endpoints
//
// Wraps `reqwest::Client` with URL construction, bearer authentication,
// and status mapping. The session token is passed per call: the client
// itself is not bound to a user and survives logouts and user switches.

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{ListBody, NotificationRecord, RecordId};
use crate::transport::TransportConfig;

/// HTTP client for `GET /notifications` and `PUT /notifications/{id}/read`.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the API root, e.g. `https://api.example.com/v1`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Fetch the complete notification list for the token's user.
    pub async fn list_notifications(
        &self,
        token: &SecretString,
    ) -> Result<Vec<NotificationRecord>, Error> {
        let url = self.url(&["notifications"])?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        let body: ListBody<NotificationRecord> = Self::parse(resp).await?;
        Ok(body.into_vec())
    }

    /// Mark one notification as read; returns the server's updated copy.
    pub async fn mark_read(
        &self,
        token: &SecretString,
        id: &RecordId,
    ) -> Result<NotificationRecord, Error> {
        let id = id.to_string();
        let url = self.url(&["notifications", &id, "read"])?;
        debug!("PUT {}", url);

        let resp = self
            .http
            .put(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        Self::parse(resp).await
    }

    // ── Helpers ──────────────────────────────────────────────────────

    /// Append `segments` to the base URL, keeping any base path segments.
    /// Each segment is percent-encoded, so ids may contain `/`, `?` or `#`.
    fn url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut joined = self.base_url.clone();
        joined
            .path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(joined)
    }

    /// Map status codes to errors and decode a JSON body.
    async fn parse<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "session expired or invalid token".into(),
            });
        }

        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Forbidden {
                message: "insufficient permissions (HTTP 403)".into(),
            });
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            return Err(Error::Api {
                status: status.as_u16(),
                message: if preview.is_empty() {
                    status.to_string()
                } else {
                    preview
                },
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }
}
