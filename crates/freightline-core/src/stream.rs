// ── Reactive notification stream ──
//
// Subscription type for consuming store changes as render-ready views.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::{NotificationState, NotificationView};

/// A subscription to the notification store.
///
/// Provides both point-in-time view access and reactive change
/// notification via the `changed()` method or by converting to a `Stream`.
pub struct NotificationStream {
    current: NotificationView,
    receiver: watch::Receiver<NotificationState>,
}

impl NotificationStream {
    pub(crate) fn new(receiver: watch::Receiver<NotificationState>) -> Self {
        let current = receiver.borrow().view();
        Self { current, receiver }
    }

    /// The view captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &NotificationView {
        &self.current
    }

    /// The latest view (may have changed since creation).
    pub fn latest(&self) -> NotificationView {
        self.receiver.borrow().view()
    }

    /// Wait for the next change, returning the new view.
    /// Returns `None` if the store has been dropped.
    pub async fn changed(&mut self) -> Option<NotificationView> {
        self.receiver.changed().await.ok()?;
        let view = self.receiver.borrow_and_update().view();
        self.current = view.clone();
        Some(view)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// The stream yields the current view first, then one per change.
    pub fn into_stream(self) -> NotificationWatchStream {
        NotificationWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct NotificationWatchStream {
    inner: WatchStream<NotificationState>,
}

impl Stream for NotificationWatchStream {
    type Item = NotificationView;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner)
            .poll_next(cx)
            .map(|state| state.map(|s| s.view()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use futures_util::StreamExt;

    use crate::model::{Notification, NotificationId, NotificationKind};
    use crate::store::NotificationStore;

    fn notification(id: i64) -> Notification {
        Notification {
            id: NotificationId::Numeric(id),
            title: "Payment settled".into(),
            message: String::new(),
            kind: NotificationKind::Success,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn changed_yields_new_view() {
        let store = NotificationStore::new();
        let mut stream = store.subscribe();
        assert!(stream.current().items.is_empty());

        store.merge(notification(1));

        let view = stream.changed().await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.unread_count, 1);
        assert_eq!(stream.current().unread_count, 1);
    }

    #[tokio::test]
    async fn into_stream_starts_with_current_view() {
        let store = NotificationStore::new();
        store.merge(notification(1));

        let mut stream = store.subscribe().into_stream();
        let first = stream.next().await.unwrap();
        assert_eq!(first.items.len(), 1);

        store.merge(notification(2));
        let second = stream.next().await.unwrap();
        assert_eq!(second.items.len(), 2);
    }
}
