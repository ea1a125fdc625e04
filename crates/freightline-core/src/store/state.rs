// ── Store state and the UI-facing view ──

use indexmap::IndexMap;
use serde::Serialize;
use strum::Display;

use crate::model::{Notification, NotificationId};

/// Progress of the most recent snapshot fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    /// Nothing fetched yet for this session.
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// Everything the store holds.
///
/// `items` is ordered newest first and keyed by id, so uniqueness holds
/// by construction. The unread count is never stored: it is computed
/// from `items` on demand.
#[derive(Debug, Clone, Default)]
pub struct NotificationState {
    pub(crate) items: IndexMap<NotificationId, Notification>,
    pub(crate) status: FetchStatus,
    pub(crate) error: Option<String>,
}

impl NotificationState {
    /// Notifications, newest first.
    pub fn items(&self) -> impl Iterator<Item = &Notification> {
        self.items.values()
    }

    pub fn get(&self, id: &NotificationId) -> Option<&Notification> {
        self.items.get(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn unread_count(&self) -> usize {
        self.items.values().filter(|n| !n.is_read).count()
    }

    pub fn status(&self) -> FetchStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Owned render snapshot.
    pub fn view(&self) -> NotificationView {
        NotificationView {
            items: self.items.values().cloned().collect(),
            unread_count: self.unread_count(),
            status: self.status,
            error: self.error.clone(),
        }
    }
}

// `IndexMap`'s own equality ignores order; two states are only equal if
// they would render identically.
impl PartialEq for NotificationState {
    fn eq(&self, other: &Self) -> bool {
        self.status == other.status
            && self.error == other.error
            && self.items.len() == other.items.len()
            && self.items.iter().eq(other.items.iter())
    }
}

impl Eq for NotificationState {}

/// The render contract: `{ items, unreadCount, status, error }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub items: Vec<Notification>,
    pub unread_count: usize,
    pub status: FetchStatus,
    pub error: Option<String>,
}
