// ── Connection supervisor ──
//
// Owns the single push connection for the signed-in session. All state
// changes (caller intents and transport completions alike) go through
// `SupervisorInner::apply`, under one lock, so there is exactly one place
// where `ConnectionState` moves.
//
// Every connection attempt is tagged with the epoch that was current when
// it was issued. `start` and `stop` bump the epoch, which turns every
// completion still in flight for an older epoch into a stale callback that
// `apply` discards.

mod backoff;

use std::sync::{Arc, Mutex};

use secrecy::SecretString;
use strum::Display;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use freightline_api::{PushConnection, PushEvent, PushTransport};

use crate::model::{Notification, Session, UserId};
use crate::store::NotificationStore;

pub use backoff::ReconnectConfig;
use backoff::calculate_backoff;

// ── ConnectionState ──────────────────────────────────────────────

/// Push connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl ConnectionState {
    /// `Connecting` or `Connected`.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

// ── Inputs to the state machine ──────────────────────────────────

#[derive(Debug)]
enum Input {
    /// Caller wants a connection for this session.
    Start(Session),
    /// Caller wants no connection.
    Stop,
    /// Caller is going away; nothing may start afterwards.
    Teardown,
    /// Transport finished dialing for `epoch` ("onopen").
    Opened { epoch: u64 },
    /// Attempt for `epoch` failed and is about to back off and redial.
    Retrying { epoch: u64 },
    /// Task for `epoch` has exited and released its connection ("onclose").
    Closed { epoch: u64 },
}

// ── Bookkeeping ──────────────────────────────────────────────────

/// A spawned connection task.
struct Attempt {
    epoch: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct Slot {
    /// Bumped by every `start` that issues an attempt and every `stop`.
    epoch: u64,
    /// Identity the current epoch is serving, if any.
    desired: Option<UserId>,
    /// Most recently spawned task, which may belong to an older epoch
    /// while it winds down.
    attempt: Option<Attempt>,
    torn_down: bool,
}

// ── ConnectionSupervisor ─────────────────────────────────────────

/// Single owner of the push connection.
///
/// Cheaply cloneable. Guarantees:
/// - at most one connection is alive at a time: a new attempt waits for
///   its predecessor's task to release its connection before dialing
/// - `start` for the identity already `Connecting`/`Connected` is a no-op
/// - `stop` is idempotent and callable from any state
/// - after [`teardown`](Self::teardown) every transport callback is a no-op
pub struct ConnectionSupervisor<T: PushTransport> {
    inner: Arc<SupervisorInner<T>>,
}

impl<T: PushTransport> Clone for ConnectionSupervisor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SupervisorInner<T: PushTransport> {
    transport: T,
    store: Arc<NotificationStore>,
    reconnect: Option<ReconnectConfig>,
    state: watch::Sender<ConnectionState>,
    slot: Mutex<Slot>,
}

impl<T: PushTransport> ConnectionSupervisor<T> {
    /// Create a supervisor that dials through `transport` and merges pushed
    /// notifications into `store`. `reconnect: None` disables retries.
    pub fn new(
        transport: T,
        store: Arc<NotificationStore>,
        reconnect: Option<ReconnectConfig>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            inner: Arc::new(SupervisorInner {
                transport,
                store,
                reconnect,
                state,
                slot: Mutex::new(Slot {
                    epoch: 0,
                    desired: None,
                    attempt: None,
                    torn_down: false,
                }),
            }),
        }
    }

    /// Establish a connection for `session`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, session: &Session) {
        self.inner.apply(Input::Start(session.clone()));
    }

    /// Tear down any active or in-flight connection.
    pub fn stop(&self) {
        self.inner.apply(Input::Stop);
    }

    /// Stop for good. Later `start` calls are ignored and any transport
    /// callback still in flight is discarded.
    pub fn teardown(&self) {
        self.inner.apply(Input::Teardown);
    }

    /// Tear down and wait for the connection task to release its connection.
    pub async fn shutdown(&self) {
        self.teardown();
        let task = self.inner.lock_slot().attempt.take().map(|a| a.task);
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "connection task ended abnormally");
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        *self.inner.state.borrow() == ConnectionState::Connected
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }
}

// ── The single mutation entry point ──────────────────────────────

impl<T: PushTransport> SupervisorInner<T> {
    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.slot.lock().expect("supervisor lock poisoned")
    }

    fn set_state(&self, next: ConnectionState, epoch: u64) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(%prev, %next, epoch, "connection state");
        }
    }

    /// Apply one input. Returns `false` if it was rejected as a no-op or
    /// a stale callback.
    fn apply(self: &Arc<Self>, input: Input) -> bool {
        let mut slot = self.lock_slot();
        let state = *self.state.borrow();

        match input {
            Input::Start(session) => {
                if slot.torn_down {
                    debug!(user = %session.user_id(), "ignoring start after teardown");
                    return false;
                }
                if slot.desired.as_ref() == Some(session.user_id()) && state.is_active() {
                    trace!(user = %session.user_id(), "already connecting or connected");
                    return false;
                }

                // A different identity (or a dead attempt) is replaced: cancel
                // it, but let the new task wait for it to finish.
                let predecessor = slot.attempt.take().map(|prev| {
                    prev.cancel.cancel();
                    prev.task
                });
                if state.is_active() {
                    self.set_state(ConnectionState::Disconnecting, slot.epoch);
                }

                slot.epoch += 1;
                let epoch = slot.epoch;
                slot.desired = Some(session.user_id().clone());
                self.set_state(ConnectionState::Connecting, epoch);
                info!(user = %session.user_id(), epoch, "starting push connection");

                let cancel = CancellationToken::new();
                let task = tokio::spawn(run_attempt(
                    Arc::clone(self),
                    epoch,
                    session.token().clone(),
                    cancel.clone(),
                    predecessor,
                ));
                slot.attempt = Some(Attempt {
                    epoch,
                    cancel,
                    task,
                });
                true
            }

            Input::Stop => self.stop_locked(&mut slot),

            Input::Teardown => {
                slot.torn_down = true;
                self.stop_locked(&mut slot)
            }

            Input::Opened { epoch } => {
                if epoch != slot.epoch || state != ConnectionState::Connecting {
                    debug!(epoch, current = slot.epoch, "discarding stale connection open");
                    return false;
                }
                self.set_state(ConnectionState::Connected, epoch);
                true
            }

            Input::Retrying { epoch } => {
                if epoch != slot.epoch {
                    return false;
                }
                self.set_state(ConnectionState::Connecting, epoch);
                true
            }

            Input::Closed { epoch } => {
                if slot.attempt.as_ref().is_some_and(|a| a.epoch == epoch) {
                    slot.attempt = None;
                }

                if epoch == slot.epoch {
                    // The current attempt ended on its own (failure or drop).
                    self.set_state(ConnectionState::Disconnected, epoch);
                    true
                } else if state == ConnectionState::Disconnecting && slot.attempt.is_none() {
                    // The attempt a `stop` was waiting on has released its connection.
                    self.set_state(ConnectionState::Disconnected, slot.epoch);
                    true
                } else {
                    false
                }
            }
        }
    }

    fn stop_locked(&self, slot: &mut Slot) -> bool {
        if slot.desired.is_none() && slot.attempt.is_none() {
            return false;
        }

        slot.epoch += 1;
        slot.desired = None;
        if let Some(ref attempt) = slot.attempt {
            attempt.cancel.cancel();
        }
        info!(epoch = slot.epoch, "stopping push connection");

        let next = if slot.attempt.as_ref().is_some_and(|a| !a.task.is_finished()) {
            ConnectionState::Disconnecting
        } else {
            ConnectionState::Disconnected
        };
        self.set_state(next, slot.epoch);
        true
    }

    /// Merge a pushed event if `epoch` is still the live one.
    fn deliver(&self, epoch: u64, event: PushEvent) {
        let slot = self.lock_slot();
        if epoch != slot.epoch || *self.state.borrow() != ConnectionState::Connected {
            debug!(epoch, current = slot.epoch, "discarding stale push event");
            return;
        }

        match event {
            PushEvent::Notification(record) => {
                let notification = Notification::from(record);
                trace!(id = %notification.id, epoch, "push notification");
                self.store.merge(notification);
            }
        }
    }
}

// ── Connection task ──────────────────────────────────────────────

/// How a live connection ended.
enum Ended {
    Cancelled,
    Dropped(Option<freightline_api::Error>),
}

async fn run_attempt<T: PushTransport>(
    inner: Arc<SupervisorInner<T>>,
    epoch: u64,
    token: SecretString,
    cancel: CancellationToken,
    predecessor: Option<JoinHandle<()>>,
) {
    // Never two live connections: let the previous task close its own first.
    if let Some(prev) = predecessor {
        if let Err(e) = prev.await {
            warn!(error = %e, "previous connection task ended abnormally");
        }
    }

    let mut retries: u32 = 0;

    loop {
        let dialed = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = inner.transport.connect(&token) => result,
        };

        let failure = match dialed {
            Ok(conn) => {
                if !inner.apply(Input::Opened { epoch }) {
                    // Late open for a session that is already gone.
                    conn.close().await;
                    break;
                }
                retries = 0;
                match pump(&inner, epoch, conn, &cancel).await {
                    Ended::Cancelled => break,
                    Ended::Dropped(err) => err,
                }
            }
            Err(e) => Some(e),
        };

        match failure {
            Some(ref e) => warn!(error = %e, epoch, "push connection failed"),
            None => info!(epoch, "push connection closed by server"),
        }

        let Some(policy) = inner.reconnect.as_ref() else {
            break;
        };
        if policy.max_retries.is_some_and(|max| retries >= max) {
            error!(retries, "push reconnection limit reached, giving up");
            break;
        }
        if !inner.apply(Input::Retrying { epoch }) {
            break;
        }

        let delay = calculate_backoff(retries, policy);
        info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            retries,
            "waiting before reconnect"
        );
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
        retries += 1;
    }

    inner.apply(Input::Closed { epoch });
}

/// Forward events from an open connection until it ends or is cancelled.
/// The connection is always closed before returning.
async fn pump<T: PushTransport>(
    inner: &SupervisorInner<T>,
    epoch: u64,
    mut conn: T::Connection,
    cancel: &CancellationToken,
) -> Ended {
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            event = conn.next_event() => Some(event),
        };

        match next {
            None => {
                conn.close().await;
                return Ended::Cancelled;
            }
            Some(Some(Ok(event))) => inner.deliver(epoch, event),
            Some(Some(Err(e))) => {
                conn.close().await;
                return Ended::Dropped(Some(e));
            }
            Some(None) => {
                conn.close().await;
                return Ended::Dropped(None);
            }
        }
    }
}
