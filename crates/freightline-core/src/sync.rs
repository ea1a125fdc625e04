// ── Notification sync facade ──
//
// The presentation-facing entry point. Wires the session observer, the
// connection supervisor, the snapshot fetcher and the store together, and
// owns the optional periodic refresh task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use freightline_api::{PushTransport, RestClient, TlsMode, TransportConfig, WsTransport};

use crate::config::{SyncConfig, TlsVerification};
use crate::error::CoreError;
use crate::fetch::SnapshotFetcher;
use crate::model::{Notification, NotificationId, Session};
use crate::session::SessionObserver;
use crate::store::{NotificationStore, NotificationView};
use crate::stream::NotificationStream;
use crate::supervisor::{ConnectionState, ConnectionSupervisor};

// ── NotificationSync ─────────────────────────────────────────────

/// Session-bound notification sync.
///
/// Cheaply cloneable. The auth layer reports sessions through
/// [`set_session`](Self::set_session); the UI drives
/// [`refresh`](Self::refresh) and [`mark_read`](Self::mark_read) and renders
/// [`view`](Self::view) or a [`subscribe`](Self::subscribe) stream.
///
/// Dropping the last clone stops the push connection and the refresh task.
pub struct NotificationSync<T: PushTransport> {
    inner: Arc<SyncInner<T>>,
}

impl<T: PushTransport> Clone for NotificationSync<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SyncInner<T: PushTransport> {
    config: SyncConfig,
    api: RestClient,
    session: Arc<SessionObserver>,
    store: Arc<NotificationStore>,
    fetcher: SnapshotFetcher,
    supervisor: ConnectionSupervisor<T>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl NotificationSync<WsTransport> {
    /// Build a sync layer that pushes over the backend WebSocket.
    pub fn websocket(config: SyncConfig) -> Result<Self, CoreError> {
        let transport = WsTransport::new(config.push_url()?);
        Self::new(config, transport)
    }
}

impl<T: PushTransport> NotificationSync<T> {
    /// Create the sync layer. Nothing runs until a session is reported.
    pub fn new(config: SyncConfig, transport: T) -> Result<Self, CoreError> {
        let api = RestClient::new(config.api_url.clone(), &build_transport(&config))?;
        Ok(Self::with_client(config, api, transport))
    }

    /// Create the sync layer around a pre-built REST client.
    pub fn with_client(config: SyncConfig, api: RestClient, transport: T) -> Self {
        let session = Arc::new(SessionObserver::new());
        let store = Arc::new(NotificationStore::new());
        let fetcher = SnapshotFetcher::new(api.clone(), Arc::clone(&session), Arc::clone(&store));
        let supervisor =
            ConnectionSupervisor::new(transport, Arc::clone(&store), config.reconnect.clone());

        Self {
            inner: Arc::new(SyncInner {
                config,
                api,
                session,
                store,
                fetcher,
                supervisor,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    // ── Session ──────────────────────────────────────────────────

    /// Report the current session (or `None` on logout).
    ///
    /// On an identity change the store is cleared and the push connection
    /// is restarted for the new user (when push is enabled), or stopped.
    /// Re-reporting the same user only refreshes the stored token. Returns
    /// `true` if the identity changed.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn set_session(&self, session: Option<Session>) -> bool {
        let inner = &self.inner;
        if !inner.session.update(session) {
            return false;
        }

        inner.store.reset();
        match inner.session.current_session() {
            Some(ref session) => {
                info!(user = %session.user_id(), "session started");
                if inner.config.push_enabled {
                    inner.supervisor.start(session);
                }
            }
            None => {
                info!("session ended");
                inner.supervisor.stop();
            }
        }
        true
    }

    pub fn session(&self) -> &Arc<SessionObserver> {
        &self.inner.session
    }

    // ── Background tasks ─────────────────────────────────────────

    /// Spawn the periodic snapshot refresh, if configured.
    ///
    /// Calling it again while the task runs has no effect.
    pub async fn start(&self) {
        let interval_secs = self.inner.config.refresh_interval_secs;
        if interval_secs == 0 {
            debug!("periodic refresh disabled");
            return;
        }

        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            return;
        }
        handles.push(tokio::spawn(refresh_task(
            self.inner.fetcher.clone(),
            Arc::clone(&self.inner.session),
            interval_secs,
            self.inner.cancel.clone(),
        )));
    }

    /// Stop the push connection and background tasks, and wait for them.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.supervisor.shutdown().await;

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }
        debug!("notification sync shut down");
    }

    // ── Presentation contract ────────────────────────────────────

    /// Fetch the full snapshot and replace the store contents.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        self.inner.fetcher.refresh().await
    }

    /// Mark a notification as read.
    ///
    /// The store is updated immediately. Unknown ids are a silent no-op. If
    /// the server call fails the error is returned and the local flag stays
    /// set; otherwise the server's copy is merged back in.
    pub async fn mark_read(&self, id: &NotificationId) -> Result<(), CoreError> {
        let inner = &self.inner;
        if !inner.store.mark_read(id) {
            debug!(%id, "mark-as-read for unknown notification ignored");
            return Ok(());
        }

        let (session, generation) = inner.session.current_with_generation();
        let Some(session) = session else {
            return Err(CoreError::NotSignedIn);
        };

        match inner.api.mark_read(session.token(), &id.into()).await {
            Ok(record) => {
                if inner.session.generation() == generation {
                    inner.store.merge(Notification::from(record));
                } else {
                    debug!(%id, "discarding mark-as-read echo for previous session");
                }
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                warn!(%id, error = %err, "mark-as-read failed, keeping local state");
                Err(err)
            }
        }
    }

    /// Render snapshot: `{ items, unread_count, status, error }`.
    pub fn view(&self) -> NotificationView {
        self.inner.store.view()
    }

    pub fn store(&self) -> &Arc<NotificationStore> {
        &self.inner.store
    }

    pub fn subscribe(&self) -> NotificationStream {
        self.inner.store.subscribe()
    }

    // ── Connection ───────────────────────────────────────────────

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.supervisor.state()
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.inner.supervisor.subscribe_state()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.supervisor.is_connected()
    }
}

impl<T: PushTransport> Drop for SyncInner<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.supervisor.teardown();
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Re-fetch the snapshot every `interval_secs` while signed in.
async fn refresh_task(
    fetcher: SnapshotFetcher,
    session: Arc<SessionObserver>,
    interval_secs: u64,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if session.identity().is_none() {
                    continue;
                }
                if let Err(e) = fetcher.refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}

/// Build a [`TransportConfig`] from the sync configuration.
fn build_transport(config: &SyncConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
