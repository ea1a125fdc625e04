#![allow(dead_code, clippy::unwrap_used)]
// Shared fixtures for freightline-core integration tests.
//
// `ScriptedTransport` is an in-memory push transport: tests decide when a
// dial completes, what it delivers, and when it drops, and can ask how
// many connections were alive at the same time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Semaphore, mpsc, watch};

use freightline_api::{Error, NotificationRecord, PushConnection, PushEvent, PushTransport, RecordId};
use freightline_core::{ConnectionState, Session};

// ── Scripted transport ──────────────────────────────────────────────

enum Feed {
    Event(PushEvent),
    Drop,
}

struct Shared {
    gate: Semaphore,
    fail_next: AtomicUsize,
    dials: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
    feeds: Mutex<Vec<mpsc::UnboundedSender<Feed>>>,
    tokens: Mutex<Vec<String>>,
    on_open: Mutex<Option<OpenHook>>,
}

type OpenHook = Box<dyn FnOnce() + Send>;

#[derive(Clone)]
pub struct ScriptedTransport {
    shared: Arc<Shared>,
}

impl ScriptedTransport {
    /// Every dial opens immediately.
    pub fn new() -> Self {
        Self::with_permits(Semaphore::MAX_PERMITS)
    }

    /// Dials stay pending until [`release_open`](Self::release_open).
    pub fn gated() -> Self {
        Self::with_permits(0)
    }

    fn with_permits(permits: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                gate: Semaphore::new(permits),
                fail_next: AtomicUsize::new(0),
                dials: AtomicUsize::new(0),
                live: AtomicUsize::new(0),
                max_live: AtomicUsize::new(0),
                feeds: Mutex::new(Vec::new()),
                tokens: Mutex::new(Vec::new()),
                on_open: Mutex::new(None),
            }),
        }
    }

    /// Let one pending dial complete.
    pub fn release_open(&self) {
        self.shared.gate.add_permits(1);
    }

    /// Run `hook` once, inside the next successful dial, right before it
    /// hands the open connection back.
    pub fn on_open(&self, hook: impl FnOnce() + Send + 'static) {
        *self.shared.on_open.lock().unwrap() = Some(Box::new(hook));
    }

    /// Make the next `n` dials fail.
    pub fn fail_next(&self, n: usize) {
        self.shared.fail_next.store(n, Ordering::SeqCst);
    }

    /// Deliver an event on the most recently opened connection.
    pub fn push(&self, record: NotificationRecord) -> bool {
        self.send(Feed::Event(PushEvent::Notification(record)))
    }

    /// Drop the most recently opened connection with an error.
    pub fn drop_connection(&self) -> bool {
        self.send(Feed::Drop)
    }

    fn send(&self, feed: Feed) -> bool {
        let feeds = self.shared.feeds.lock().unwrap();
        feeds.last().is_some_and(|tx| tx.send(feed).is_ok())
    }

    pub fn dials(&self) -> usize {
        self.shared.dials.load(Ordering::SeqCst)
    }

    /// Connections opened so far.
    pub fn opened(&self) -> usize {
        self.shared.feeds.lock().unwrap().len()
    }

    pub fn live(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.shared.max_live.load(Ordering::SeqCst)
    }

    pub fn tokens(&self) -> Vec<String> {
        self.shared.tokens.lock().unwrap().clone()
    }
}

impl PushTransport for ScriptedTransport {
    type Connection = ScriptedConnection;

    async fn connect(&self, token: &SecretString) -> Result<ScriptedConnection, Error> {
        self.shared.dials.fetch_add(1, Ordering::SeqCst);
        self.shared
            .tokens
            .lock()
            .unwrap()
            .push(token.expose_secret().to_owned());

        let failed = self
            .shared
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(Error::WebSocketConnect("scripted dial failure".into()));
        }

        self.shared
            .gate
            .acquire()
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?
            .forget();

        let live = self.shared.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.max_live.fetch_max(live, Ordering::SeqCst);

        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.feeds.lock().unwrap().push(tx);

        let hook = self.shared.on_open.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }

        Ok(ScriptedConnection {
            rx,
            shared: Arc::clone(&self.shared),
        })
    }
}

pub struct ScriptedConnection {
    rx: mpsc::UnboundedReceiver<Feed>,
    shared: Arc<Shared>,
}

impl PushConnection for ScriptedConnection {
    async fn next_event(&mut self) -> Option<Result<PushEvent, Error>> {
        match self.rx.recv().await? {
            Feed::Event(event) => Some(Ok(event)),
            Feed::Drop => Some(Err(Error::WebSocketClosed {
                code: 1011,
                reason: "scripted drop".into(),
            })),
        }
    }

    async fn close(self) {}
}

impl Drop for ScriptedConnection {
    fn drop(&mut self) {
        self.shared.live.fetch_sub(1, Ordering::SeqCst);
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

pub fn session(user: &str) -> Session {
    Session::new(user, SecretString::from(format!("token-{user}")))
}

pub fn record(id: i64, title: &str, is_read: bool) -> NotificationRecord {
    NotificationRecord {
        id: RecordId::Number(id),
        title: title.into(),
        message: format!("message {id}"),
        kind: "info".into(),
        is_read,
        created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
    }
}

/// Wait (bounded) until the connection state equals `want`.
pub async fn wait_for_state(rx: &mut watch::Receiver<ConnectionState>, want: ConnectionState) {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == want))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {want}"))
        .unwrap();
}

/// Wait (bounded) until `check` holds, yielding to other tasks in between.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !check() {
        assert!(tokio::time::Instant::now() < deadline, "condition never held");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Records every connection state a receiver observes.
pub fn record_states(mut rx: watch::Receiver<ConnectionState>) -> Arc<Mutex<Vec<ConnectionState>>> {
    let seen = Arc::new(Mutex::new(vec![*rx.borrow_and_update()]));
    let sink = Arc::clone(&seen);
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = *rx.borrow_and_update();
            sink.lock().unwrap().push(state);
        }
    });
    seen
}
