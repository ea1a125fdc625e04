// ── Reactive notification store ──
//
// Ordered, deduplicated notification storage with push-based change
// notification.

mod notification_store;
mod state;

pub use notification_store::NotificationStore;
pub use state::{FetchStatus, NotificationState, NotificationView};
