// ── API-to-domain type conversions ──
//
// Bridges raw `freightline_api` wire types into canonical `freightline_core`
// domain types. Unknown enum strings degrade to a sensible default instead
// of failing the whole snapshot.

use freightline_api::{NotificationRecord, RecordId};
use tracing::debug;

use crate::model::{Notification, NotificationId, NotificationKind};

impl From<RecordId> for NotificationId {
    fn from(id: RecordId) -> Self {
        match id {
            RecordId::Number(n) => Self::Numeric(n),
            RecordId::Text(s) => Self::Text(s),
        }
    }
}

impl From<&NotificationId> for RecordId {
    fn from(id: &NotificationId) -> Self {
        match id {
            NotificationId::Numeric(n) => Self::Number(*n),
            NotificationId::Text(s) => Self::Text(s.clone()),
        }
    }
}

fn parse_kind(raw: &str) -> NotificationKind {
    raw.parse().unwrap_or_else(|_| {
        debug!(kind = raw, "unknown notification type, treating as info");
        NotificationKind::Info
    })
}

impl From<NotificationRecord> for Notification {
    fn from(r: NotificationRecord) -> Self {
        Self {
            id: r.id.into(),
            title: r.title,
            message: r.message,
            kind: parse_kind(&r.kind),
            is_read: r.is_read,
            created_at: r.created_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(kind: &str) -> NotificationRecord {
        NotificationRecord {
            id: RecordId::Number(7),
            title: "Vehicle ad approved".into(),
            message: "Your 7.5t curtainsider is live".into(),
            kind: kind.into(),
            is_read: true,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn record_converts_to_notification() {
        let n = Notification::from(record("success"));
        assert_eq!(n.id, NotificationId::Numeric(7));
        assert_eq!(n.kind, NotificationKind::Success);
        assert!(n.is_read);
    }

    #[test]
    fn unknown_kind_falls_back_to_info() {
        let n = Notification::from(record("promo"));
        assert_eq!(n.kind, NotificationKind::Info);
    }

    #[test]
    fn id_round_trips_through_record_id() {
        let id = NotificationId::Text("abc".into());
        let raw = RecordId::from(&id);
        assert_eq!(NotificationId::from(raw), id);
    }
}
