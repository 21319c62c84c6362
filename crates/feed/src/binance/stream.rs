use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use common::{Config, ConnectionState, Instrument, PriceUpdate};

use crate::binance::wire::{parse_trade_event, subscribe_frame};
use crate::transport::{Connector, Frame};
use crate::UpdateHandler;

/// Where and what the stream manager subscribes to.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub url: String,
    pub instruments: Vec<Instrument>,
    /// Fixed wait between a close and the next connection attempt.
    pub reconnect_delay: Duration,
}

impl FeedSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            url: cfg.feed_url.clone(),
            instruments: Instrument::ALL.to_vec(),
            reconnect_delay: cfg.reconnect_delay,
        }
    }
}

/// Owns the single multiplexed trade-stream connection.
///
/// State machine: `Disconnected -> Connecting -> Open -> Disconnected`, with
/// `Closing` entered only through [`StreamManager::teardown`]. Every
/// connection runs in its own task; the task also waits out the reconnect
/// delay, so teardown cancels a pending reconnect along with the socket.
///
/// Cloning yields another handle to the same connection.
#[derive(Clone)]
pub struct StreamManager {
    shared: Arc<Shared>,
}

struct Shared {
    settings: FeedSettings,
    connector: Arc<dyn Connector>,
    conn: Mutex<ConnSlot>,
    /// Held for the duration of each handler call.
    handler: Mutex<Option<UpdateHandler>>,
}

struct ConnSlot {
    state: ConnectionState,
    /// Bumped for every new connection task; stale tasks compare and back off.
    generation: u64,
    /// Stops the current connection task (close frame or cancelled timer).
    shutdown: Option<oneshot::Sender<()>>,
}

enum SessionEnd {
    /// Connection failed or was lost; reconnect if still subscribed.
    Closed,
    /// Told to stop by teardown or a newer connection.
    Shutdown,
}

impl StreamManager {
    pub fn new(settings: FeedSettings, connector: Arc<dyn Connector>) -> Self {
        Self {
            shared: Arc::new(Shared {
                settings,
                connector,
                conn: Mutex::new(ConnSlot {
                    state: ConnectionState::Disconnected,
                    generation: 0,
                    shutdown: None,
                }),
                handler: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.conn.lock().state
    }

    /// Register `handler` as the only receiver of updates, replacing any
    /// previous one, and make sure a connection exists.
    ///
    /// The handler runs on the connection task and must not call back into
    /// this manager; forward into a channel instead.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn subscribe(&self, handler: UpdateHandler) {
        let replaced = self.shared.handler.lock().replace(handler).is_some();
        if replaced {
            debug!("Replaced existing price update handler");
        }
        self.ensure_connected();
    }

    /// Open a connection unless one is already connecting or open.
    ///
    /// A reconnect waiting out its delay is retired and replaced by an
    /// immediate attempt.
    pub fn ensure_connected(&self) {
        let mut slot = self.shared.conn.lock();
        if matches!(slot.state, ConnectionState::Connecting | ConnectionState::Open) {
            debug!(state = %slot.state, "Feed already active");
            return;
        }

        if let Some(stale) = slot.shutdown.take() {
            let _ = stale.send(());
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        slot.generation += 1;
        slot.state = ConnectionState::Connecting;
        slot.shutdown = Some(shutdown_tx);
        let generation = slot.generation;
        drop(slot);

        tokio::spawn(run_connection(self.shared.clone(), generation, shutdown_rx));
    }

    /// Drop the handler and close the connection with a normal closure.
    ///
    /// No handler call happens after this returns, and no reconnect follows.
    /// Calling it with nothing connected is a no-op.
    pub fn teardown(&self) {
        // Waits for an in-flight handler call to finish.
        self.shared.handler.lock().take();

        let mut slot = self.shared.conn.lock();
        match slot.shutdown.take() {
            Some(shutdown) => {
                slot.state = ConnectionState::Closing;
                let _ = shutdown.send(());
                info!("Price feed unsubscribed, closing connection");
            }
            None => debug!("Teardown with no active connection"),
        }
    }
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.conn.lock().generation == generation
    }

    fn mark_open(&self, generation: u64) -> bool {
        let mut slot = self.conn.lock();
        if slot.generation != generation || slot.state != ConnectionState::Connecting {
            return false;
        }
        slot.state = ConnectionState::Open;
        true
    }

    /// Close event. Returns whether a reconnect should be scheduled.
    fn on_close(&self, generation: u64) -> bool {
        let mut slot = self.conn.lock();
        if slot.generation != generation {
            return false;
        }
        slot.state = ConnectionState::Disconnected;
        let subscribed = self.handler.lock().is_some();
        if !subscribed {
            slot.shutdown = None;
        }
        subscribed
    }

    /// Reconnect timer fired. Only proceeds if nothing changed meanwhile.
    fn begin_reconnect(&self, generation: u64) -> bool {
        let mut slot = self.conn.lock();
        if slot.generation != generation
            || slot.state != ConnectionState::Disconnected
            || self.handler.lock().is_none()
        {
            return false;
        }
        slot.state = ConnectionState::Connecting;
        true
    }

    /// Connection task finished after a shutdown request.
    fn mark_closed(&self, generation: u64) {
        let mut slot = self.conn.lock();
        if slot.generation == generation {
            slot.state = ConnectionState::Disconnected;
            slot.shutdown = None;
        }
    }

    fn dispatch(&self, generation: u64, text: &str) {
        let update = match parse_trade_event(text) {
            Ok(Some(update)) => update,
            Ok(None) => return,
            Err(e) => {
                debug!(error = %e, "Dropping malformed feed message");
                return;
            }
        };
        if !self.is_current(generation) {
            return;
        }
        self.deliver(update);
    }

    fn deliver(&self, update: PriceUpdate) {
        let handler = self.handler.lock();
        if let Some(handler) = handler.as_ref() {
            handler(update);
        }
    }
}

async fn run_connection(
    shared: Arc<Shared>,
    generation: u64,
    mut shutdown: oneshot::Receiver<()>,
) {
    let delay = shared.settings.reconnect_delay;
    loop {
        if let SessionEnd::Shutdown = run_session(&shared, generation, &mut shutdown).await {
            shared.mark_closed(generation);
            return;
        }

        if !shared.on_close(generation) {
            info!("Price feed closed with no subscriber, not reconnecting");
            return;
        }
        warn!(delay = ?delay, "Price feed connection closed, reconnecting");

        tokio::select! {
            _ = &mut shutdown => {
                shared.mark_closed(generation);
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        if !shared.begin_reconnect(generation) {
            return;
        }
    }
}

async fn run_session(
    shared: &Shared,
    generation: u64,
    shutdown: &mut oneshot::Receiver<()>,
) -> SessionEnd {
    let url = &shared.settings.url;
    info!(%url, "Connecting to price feed");

    let mut transport = tokio::select! {
        _ = &mut *shutdown => return SessionEnd::Shutdown,
        connected = shared.connector.connect(url) => match connected {
            Ok(transport) => transport,
            Err(e) => {
                warn!(error = %e, "Price feed connection failed");
                return SessionEnd::Closed;
            }
        },
    };

    let handshake = subscribe_frame(&shared.settings.instruments);
    if let Err(e) = transport.send_text(handshake).await {
        warn!(error = %e, "Price feed subscribe failed");
        return SessionEnd::Closed;
    }
    if !shared.mark_open(generation) {
        let _ = transport.close().await;
        return SessionEnd::Shutdown;
    }
    info!(instruments = ?shared.settings.instruments, "Real-time price feed connected");

    loop {
        tokio::select! {
            _ = &mut *shutdown => {
                if let Err(e) = transport.close().await {
                    debug!(error = %e, "Close frame not delivered");
                }
                return SessionEnd::Shutdown;
            }
            frame = transport.next_frame() => match frame {
                Some(Ok(Frame::Text(text))) => shared.dispatch(generation, &text),
                Some(Ok(Frame::Other)) => {}
                Some(Ok(Frame::Close)) | None => return SessionEnd::Closed,
                // Reported only; the close that follows drives recovery.
                Some(Err(e)) => warn!(error = %e, "Price feed transport error"),
            },
        }
    }
}
