// ── Snapshot fetcher ──
//
// Retrieves the authoritative notification list over REST and hands it to
// the store. Results are tagged with the session generation and a request
// ticket; anything that resolves after a logout, a user switch, or a newer
// fetch is dropped on the floor.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use freightline_api::RestClient;

use crate::error::CoreError;
use crate::model::Notification;
use crate::session::SessionObserver;
use crate::store::NotificationStore;

/// Fetches the full notification snapshot for the current session.
#[derive(Clone)]
pub struct SnapshotFetcher {
    api: RestClient,
    session: Arc<SessionObserver>,
    store: Arc<NotificationStore>,
    ticket: Arc<AtomicU64>,
}

impl SnapshotFetcher {
    pub fn new(
        api: RestClient,
        session: Arc<SessionObserver>,
        store: Arc<NotificationStore>,
    ) -> Self {
        Self {
            api,
            session,
            store,
            ticket: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Fetch and replace the store contents.
    ///
    /// Sets the store status to `loading`, then `succeeded` or `failed`.
    /// A result that arrives after the session changed (or after a newer
    /// refresh was issued) is discarded and `Ok(())` is returned.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let (session, generation) = self.session.current_with_generation();
        let Some(session) = session else {
            return Err(CoreError::NotSignedIn);
        };

        let ticket = self.ticket.fetch_add(1, Ordering::AcqRel) + 1;
        self.store.begin_fetch();

        let result = self.api.list_notifications(session.token()).await;

        if self.is_stale(generation, ticket) {
            debug!(ticket, user = %session.user_id(), "discarding stale snapshot");
            return Ok(());
        }

        match result {
            Ok(records) => {
                debug!(count = records.len(), "snapshot fetched");
                self.store
                    .replace(records.into_iter().map(Notification::from).collect());
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                warn!(error = %err, "snapshot fetch failed");
                self.store.fail_fetch(err.to_string());
                Err(err)
            }
        }
    }

    fn is_stale(&self, generation: u64, ticket: u64) -> bool {
        self.session.generation() != generation || self.ticket.load(Ordering::Acquire) != ticket
    }
}
