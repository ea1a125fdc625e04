// ── Notification store ──
//
// Single owner of the notification list. Every mutation goes through a
// `watch` channel so subscribers see whole, consistent states; no-op
// mutations do not wake subscribers.

use indexmap::IndexMap;
use tokio::sync::watch;
use tracing::{debug, trace};

use super::state::{FetchStatus, NotificationState, NotificationView};
use crate::model::{Notification, NotificationId};
use crate::stream::NotificationStream;

/// Ordered, deduplicated notification collection.
///
/// Reconciliation rules:
/// - [`replace`](Self::replace) is authoritative: the server's list and its
///   `is_read` flags win wholesale.
/// - [`merge`](Self::merge) is additive and never flips `is_read` from
///   `true` back to `false`.
/// - [`mark_read`](Self::mark_read) only ever sets `is_read`.
pub struct NotificationStore {
    state: watch::Sender<NotificationState>,
}

impl NotificationStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(NotificationState::default());
        Self { state }
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Replace the whole list with a fetched snapshot.
    ///
    /// Order follows the snapshot; if the snapshot repeats an id, the first
    /// occurrence wins. Marks the fetch as succeeded.
    pub fn replace(&self, snapshot: Vec<Notification>) {
        let mut items = IndexMap::with_capacity(snapshot.len());
        for notification in snapshot {
            items.entry(notification.id.clone()).or_insert(notification);
        }

        let next = NotificationState {
            items,
            status: FetchStatus::Succeeded,
            error: None,
        };

        let changed = self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        });

        debug!(changed, "snapshot applied");
    }

    /// Merge a pushed notification.
    ///
    /// Unknown ids are prepended. Known ids keep their position and take the
    /// pushed fields, except that a read notification stays read.
    pub fn merge(&self, pushed: Notification) {
        self.state.send_if_modified(|state| {
            if let Some(existing) = state.items.get_mut(&pushed.id) {
                let merged = Notification {
                    is_read: existing.is_read || pushed.is_read,
                    ..pushed
                };
                if *existing == merged {
                    trace!(id = %merged.id, "push merge was a no-op");
                    return false;
                }
                trace!(id = %merged.id, "push merge updated notification");
                *existing = merged;
            } else {
                trace!(id = %pushed.id, "push merge inserted notification");
                state.items.shift_insert(0, pushed.id.clone(), pushed);
            }
            true
        });
    }

    /// Optimistically mark a notification as read.
    ///
    /// Returns `false` if the id is unknown (the store is left untouched).
    pub fn mark_read(&self, id: &NotificationId) -> bool {
        let mut known = false;
        self.state.send_if_modified(|state| match state.items.get_mut(id) {
            Some(n) => {
                known = true;
                let was_unread = !n.is_read;
                n.is_read = true;
                was_unread
            }
            None => false,
        });
        known
    }

    /// Flag a snapshot fetch as in flight. Items are kept.
    pub fn begin_fetch(&self) {
        self.state.send_if_modified(|state| {
            let changed = state.status != FetchStatus::Loading || state.error.is_some();
            state.status = FetchStatus::Loading;
            state.error = None;
            changed
        });
    }

    /// Record a failed snapshot fetch. Items are kept.
    pub fn fail_fetch(&self, message: impl Into<String>) {
        let message = message.into();
        self.state.send_modify(|state| {
            state.status = FetchStatus::Failed;
            state.error = Some(message);
        });
    }

    /// Drop everything (session ended or switched).
    pub fn reset(&self) {
        self.state.send_if_modified(|state| {
            if *state == NotificationState::default() {
                return false;
            }
            *state = NotificationState::default();
            true
        });
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn unread_count(&self) -> usize {
        self.state.borrow().unread_count()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().is_empty()
    }

    pub fn get(&self, id: &NotificationId) -> Option<Notification> {
        self.state.borrow().get(id).cloned()
    }

    /// Look up a notification by its displayed id, as typed by a user.
    ///
    /// A text id equal to `key` wins; otherwise a numeric id with the same
    /// digits matches.
    pub fn find_by_key(&self, key: &str) -> Option<Notification> {
        let state = self.state.borrow();
        state
            .get(&NotificationId::Text(key.to_owned()))
            .or_else(|| {
                key.parse::<i64>()
                    .ok()
                    .and_then(|n| state.get(&NotificationId::Numeric(n)))
            })
            .cloned()
    }

    pub fn status(&self) -> FetchStatus {
        self.state.borrow().status()
    }

    /// Owned copy of the current state.
    pub fn state(&self) -> NotificationState {
        self.state.borrow().clone()
    }

    /// Render snapshot: `{ items, unread_count, status, error }`.
    pub fn view(&self) -> NotificationView {
        self.state.borrow().view()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe(&self) -> NotificationStream {
        NotificationStream::new(self.state.subscribe())
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}
