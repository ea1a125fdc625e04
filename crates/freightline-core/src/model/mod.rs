// ── Domain model ──
//
// Types consumers see. Wire formats live in freightline-api; `convert`
// bridges the two.

mod notification;
mod session;

pub use notification::{Notification, NotificationId, NotificationKind};
pub use session::{Session, UserId};
