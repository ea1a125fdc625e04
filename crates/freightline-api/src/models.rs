// Wire types for the notification endpoints.
//
// These mirror the backend's JSON exactly (camelCase, `type` keyword).
// `freightline-core` converts them into its domain model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notification identifier as the backend sends it.
///
/// Numeric in most deployments, but some older endpoints return strings,
/// so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A notification as returned by `GET /notifications` and pushed over
/// the WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: RecordId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    /// `info`, `success`, `warning` or `error`.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

fn default_kind() -> String {
    "info".into()
}

/// A typed frame from the push channel.
///
/// Frames have the shape `{ "type": "...", "data": { ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    /// A new or updated notification for the connected user.
    Notification(NotificationRecord),
}

/// `GET /notifications` body. Older deployments wrap the list in `{ data }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListBody<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListBody<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Wrapped { data: items } => items,
        }
    }
}
