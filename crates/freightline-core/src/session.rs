// ── Session observer ──
//
// Tracks the identity of the signed-in user and signals identity changes
// (login, logout, user switch) over a `watch` channel.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::debug;

use crate::model::{Session, UserId};

/// Exposes the current session and emits a change signal exactly once per
/// identity change.
///
/// Re-announcing the same user is not a fresh login: the stored session is
/// refreshed (e.g. a rotated token) without waking subscribers.
pub struct SessionObserver {
    current: watch::Sender<Option<Session>>,
    generation: AtomicU64,
}

impl SessionObserver {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current,
            generation: AtomicU64::new(0),
        }
    }

    /// The current authenticated session, if any.
    pub fn current_session(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    /// The identity of the current session, if any.
    pub fn identity(&self) -> Option<UserId> {
        self.current.borrow().as_ref().map(|s| s.user_id().clone())
    }

    /// Bumped on every identity change. Async work tagged with a
    /// generation is stale once this moves on.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// The current session together with the generation it belongs to.
    ///
    /// Both are read under one borrow of the channel, so a concurrent
    /// identity change cannot pair one user's session with the next
    /// user's generation.
    pub fn current_with_generation(&self) -> (Option<Session>, u64) {
        let current = self.current.borrow();
        (current.clone(), self.generation.load(Ordering::Acquire))
    }

    /// Record the session reported by the auth layer.
    ///
    /// Unauthenticated sessions count as no session. Returns `true` if the
    /// identity changed (and subscribers were notified).
    pub fn update(&self, session: Option<Session>) -> bool {
        let session = session.filter(Session::is_authenticated);

        self.current.send_if_modified(|current| {
            let before = current.as_ref().map(Session::user_id);
            let after = session.as_ref().map(Session::user_id);
            let changed = before != after;

            if changed {
                let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
                debug!(
                    from = ?before.map(UserId::as_str),
                    to = ?after.map(UserId::as_str),
                    generation,
                    "session identity changed"
                );
            }

            *current = session;
            changed
        })
    }

    /// Subscribe to identity changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.current.subscribe()
    }
}

impl Default for SessionObserver {
    fn default() -> Self {
        Self::new()
    }
}
