// ── Notification domain types ──

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Stable notification identifier.
///
/// The backend uses numeric ids; string ids are kept for endpoints that
/// return opaque keys. Equality is exact: `Numeric(5)` and `Text("5")`
/// are different notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationId {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for NotificationId {
    fn from(n: i64) -> Self {
        Self::Numeric(n)
    }
}

impl From<&str> for NotificationId {
    fn from(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| Self::Text(s.to_owned()))
    }
}

impl FromStr for NotificationId {
    type Err = std::convert::Infallible;

    /// Digits parse as numeric ids, anything else is kept verbatim.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<i64>()
            .map_or_else(|_| Self::Text(s.to_owned()), Self::Numeric))
    }
}

/// Severity shown next to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

/// A single user notification.
///
/// Created by a push event or a snapshot fetch. The only local mutation
/// is `is_read` going from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
