//! WebSocket transport for the note change feed.
//!
//! DESIGN
//! ======
//! [`WsChangeFeed`] owns a [`LocalFeed`] hub and a [`ConnectionTracker`].
//! Text frames from `/api/notes/feed` are decoded and fanned out to every
//! subscriber; undecodable frames are logged and skipped.
//!
//! LIFECYCLE
//! =========
//! 1. [`WsChangeFeed::connect`] (browser only) spawns the connection loop
//! 2. The loop reports `Connecting`, opens the socket, reports `Connected`
//! 3. When the socket ends it reports `Disconnected`, sleeps for the backoff
//!    delay (1s doubling to 10s, reset on connect) and starts over
//! 4. [`WsChangeFeed::close`] or dropping the feed stops the loop; the loop
//!    only holds a weak reference, so it never keeps the feed alive

#[cfg(test)]
#[path = "realtime_test.rs"]
mod realtime_test;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::feed::{ChangeFeed, LocalFeed, NoteHandler, Subscription};

const FEED_PATH: &str = "/api/notes/feed";

const INITIAL_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF_MS: u64 = 10_000;

// =============================================================================
// CONNECTION STATE
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Connection status plus the reconnect delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTracker {
    status: ConnectionStatus,
    next_delay_ms: u64,
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self { status: ConnectionStatus::Disconnected, next_delay_ms: INITIAL_BACKOFF_MS }
    }
}

impl ConnectionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn connecting(&mut self) {
        self.status = ConnectionStatus::Connecting;
    }

    /// A socket opened; the next failure starts the backoff over.
    pub fn connected(&mut self) {
        self.status = ConnectionStatus::Connected;
        self.next_delay_ms = INITIAL_BACKOFF_MS;
    }

    /// The socket ended. Returns how long to wait before reconnecting.
    pub fn disconnected(&mut self) -> Duration {
        self.status = ConnectionStatus::Disconnected;
        let delay = self.next_delay_ms;
        self.next_delay_ms = (delay * 2).min(MAX_BACKOFF_MS);
        Duration::from_millis(delay)
    }
}

/// Change-feed websocket URL for a service origin: `http` becomes `ws` and
/// `https` becomes `wss`. `None` for any other scheme.
#[must_use]
pub fn feed_url(base_url: &str) -> Option<String> {
    let base = base_url.trim_end_matches('/');
    if let Some(rest) = base.strip_prefix("https://") {
        return Some(format!("wss://{rest}{FEED_PATH}"));
    }
    base.strip_prefix("http://")
        .map(|rest| format!("ws://{rest}{FEED_PATH}"))
}

// =============================================================================
// FEED
// =============================================================================

pub type StatusHandler = Box<dyn FnMut(ConnectionStatus)>;

struct Shared {
    hub: LocalFeed,
    tracker: RefCell<ConnectionTracker>,
    on_status: RefCell<Option<StatusHandler>>,
    closed: Cell<bool>,
    /// Ends the current connection early.
    #[cfg(target_arch = "wasm32")]
    stop: RefCell<Option<futures::channel::oneshot::Sender<()>>>,
}

impl Shared {
    /// Apply a transition and tell the status handler when the status moved.
    fn update<T>(&self, transition: impl FnOnce(&mut ConnectionTracker) -> T) -> T {
        let (before, after, out) = {
            let mut tracker = self.tracker.borrow_mut();
            let before = tracker.status();
            let out = transition(&mut tracker);
            (before, tracker.status(), out)
        };
        if before != after {
            debug!(status = ?after, "realtime: status changed");
            let handler = self.on_status.borrow_mut().take();
            if let Some(mut handler) = handler {
                handler(after);
                let mut slot = self.on_status.borrow_mut();
                if slot.is_none() {
                    *slot = Some(handler);
                }
            }
        }
        out
    }

    #[cfg(target_arch = "wasm32")]
    fn stop_connection(&self) {
        let stop = self.stop.borrow_mut().take();
        if let Some(stop) = stop {
            if stop.send(()).is_err() {
                debug!("realtime: connection already ended");
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn stop_connection(&self) {}

    fn deliver(&self, frame: &str) {
        if let Err(e) = self.hub.publish_json(frame) {
            warn!(error = %e, "realtime: ignoring malformed frame");
        }
    }
}

/// Change feed fed by the server's websocket.
pub struct WsChangeFeed {
    shared: Rc<Shared>,
}

impl Default for WsChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl WsChangeFeed {
    /// A feed with no transport yet. Frames can be pushed with
    /// [`WsChangeFeed::deliver`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Rc::new(Shared {
                hub: LocalFeed::new(),
                tracker: RefCell::new(ConnectionTracker::new()),
                on_status: RefCell::new(None),
                closed: Cell::new(false),
                #[cfg(target_arch = "wasm32")]
                stop: RefCell::new(None),
            }),
        }
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.shared.tracker.borrow().status()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// Call `handler` on every status change. Replaces any earlier handler.
    pub fn on_status_change(&self, handler: StatusHandler) {
        *self.shared.on_status.borrow_mut() = Some(handler);
    }

    /// Decode one transport frame and hand it to subscribers.
    pub fn deliver(&self, frame: &str) {
        self.shared.deliver(frame);
    }

    /// Stop reconnecting and end the current connection.
    pub fn close(&self) {
        if self.shared.closed.replace(true) {
            return;
        }
        self.shared.stop_connection();
        self.shared.update(|tracker| {
            tracker.disconnected();
        });
        info!("realtime: closed");
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.get()
    }
}

impl ChangeFeed for WsChangeFeed {
    fn subscribe(&self, on_insert: NoteHandler, on_delete: NoteHandler) -> Subscription {
        self.shared.hub.subscribe(on_insert, on_delete)
    }
}

impl Drop for WsChangeFeed {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// BROWSER TRANSPORT
// =============================================================================

#[cfg(target_arch = "wasm32")]
impl WsChangeFeed {
    /// Open the change feed of the service at `base_url` and keep it open,
    /// reconnecting with backoff, until the feed is closed or dropped.
    #[must_use]
    pub fn connect(base_url: &str) -> Self {
        let feed = Self::new();
        match feed_url(base_url) {
            Some(url) => wasm_bindgen_futures::spawn_local(run(url, Rc::downgrade(&feed.shared))),
            None => warn!(base_url, "realtime: base url is not http(s); feed stays offline"),
        }
        feed
    }
}

/// Reconnect loop. Exits once the feed is closed or gone.
#[cfg(target_arch = "wasm32")]
async fn run(url: String, shared: std::rc::Weak<Shared>) {
    loop {
        match shared.upgrade() {
            Some(s) if !s.closed.get() => s.update(ConnectionTracker::connecting),
            _ => return,
        }

        match connect_and_run(&url, &shared).await {
            Ok(()) => info!("realtime: disconnected"),
            Err(e) => warn!(error = %e, "realtime: connection failed"),
        }

        let delay = match shared.upgrade() {
            Some(s) if !s.closed.get() => s.update(ConnectionTracker::disconnected),
            _ => return,
        };
        gloo_timers::future::sleep(delay).await;
    }
}

/// Open the socket and deliver frames until it ends or the feed stops it.
#[cfg(target_arch = "wasm32")]
async fn connect_and_run(url: &str, shared: &std::rc::Weak<Shared>) -> Result<(), String> {
    use futures::StreamExt;
    use futures::channel::oneshot;
    use gloo_net::websocket::Message;
    use gloo_net::websocket::futures::WebSocket;

    let mut ws = WebSocket::open(url).map_err(|e| e.to_string())?;
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    match shared.upgrade() {
        Some(s) => {
            *s.stop.borrow_mut() = Some(stop_tx);
            s.update(ConnectionTracker::connected);
        }
        None => return Ok(()),
    }

    let recv = async {
        while let Some(msg) = ws.next().await {
            let Some(s) = shared.upgrade() else {
                return Ok(());
            };
            match msg {
                Ok(Message::Text(text)) => s.deliver(&text),
                Ok(Message::Bytes(_)) => {}
                Err(e) => return Err(e.to_string()),
            }
        }
        Ok(())
    };

    match futures::future::select(Box::pin(recv), stop_rx).await {
        futures::future::Either::Left((result, _)) => result,
        futures::future::Either::Right(_) => Ok(()),
    }
}
