// freightline-core: Session-bound notification sync between freightline-api and consumers (CLI/UI).

pub mod config;
pub mod convert;
pub mod error;
pub mod fetch;
pub mod model;
pub mod session;
pub mod store;
pub mod stream;
pub mod supervisor;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{SyncConfig, TlsVerification};
pub use error::CoreError;
pub use fetch::SnapshotFetcher;
pub use model::{Notification, NotificationId, NotificationKind, Session, UserId};
pub use session::SessionObserver;
pub use store::{FetchStatus, NotificationState, NotificationStore, NotificationView};
pub use stream::NotificationStream;
pub use supervisor::{ConnectionState, ConnectionSupervisor, ReconnectConfig};
pub use sync::NotificationSync;

// Transport seam, re-exported so consumers need not depend on the api crate.
pub use freightline_api::{PushConnection, PushEvent, PushTransport, WsTransport};
