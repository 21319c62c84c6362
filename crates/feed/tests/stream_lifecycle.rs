use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use common::{ConnectionState, Error, Instrument, PriceUpdate, Result};
use feed::{Connector, FeedSettings, FeedTransport, Frame, PriceFeed, StreamManager, UpdateHandler};

// ─── In-memory transport ─────────────────────────────────────────────────────

/// Test side of one connection.
struct Server {
    inbound: mpsc::UnboundedSender<Result<Frame>>,
    outbound: mpsc::UnboundedReceiver<String>,
    closed_by_client: Arc<AtomicBool>,
}

impl Server {
    fn send(&self, text: &str) {
        self.inbound.send(Ok(Frame::Text(text.to_string()))).unwrap();
    }

    fn trade(&self, symbol: &str, price: &str) {
        self.send(&format!(r#"{{"e":"trade","s":"{symbol}","p":"{price}"}}"#));
    }
}

struct ChannelTransport {
    inbound: mpsc::UnboundedReceiver<Result<Frame>>,
    outbound: mpsc::UnboundedSender<String>,
    closed_by_client: Arc<AtomicBool>,
}

#[async_trait]
impl FeedTransport for ChannelTransport {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.outbound
            .send(text)
            .map_err(|e| Error::WebSocket(e.to_string()))
    }

    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        self.inbound.recv().await
    }

    async fn close(&mut self) -> Result<()> {
        self.closed_by_client.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeConnector {
    attempts: AtomicUsize,
    fail_first: usize,
    servers: mpsc::UnboundedSender<Server>,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _url: &str) -> Result<Box<dyn FeedTransport>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_first {
            return Err(Error::WebSocket("connection refused".into()));
        }
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let _ = self.servers.send(Server {
            inbound: inbound_tx,
            outbound: outbound_rx,
            closed_by_client: closed.clone(),
        });
        Ok(Box::new(ChannelTransport {
            inbound: inbound_rx,
            outbound: outbound_tx,
            closed_by_client: closed,
        }))
    }
}

// ─── Harness ─────────────────────────────────────────────────────────────────

const DELAY: Duration = Duration::from_secs(5);

struct Harness {
    manager: StreamManager,
    connector: Arc<FakeConnector>,
    servers: mpsc::UnboundedReceiver<Server>,
}

impl Harness {
    fn new(fail_first: usize) -> Self {
        let (servers_tx, servers) = mpsc::unbounded_channel();
        let connector = Arc::new(FakeConnector {
            attempts: AtomicUsize::new(0),
            fail_first,
            servers: servers_tx,
        });
        let settings = FeedSettings {
            url: "ws://feed.test/ws".into(),
            instruments: Instrument::ALL.to_vec(),
            reconnect_delay: DELAY,
        };
        let manager = StreamManager::new(settings, connector.clone());
        Self {
            manager,
            connector,
            servers,
        }
    }

    fn attempts(&self) -> usize {
        self.connector.attempts.load(Ordering::SeqCst)
    }

    async fn next_server(&mut self) -> Server {
        let server = self.servers.recv().await.expect("connector dropped");
        settle().await;
        server
    }
}

fn recorder() -> (UpdateHandler, Arc<Mutex<Vec<PriceUpdate>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let handler: UpdateHandler = Arc::new(move |u| sink.lock().unwrap().push(u));
    (handler, seen)
}

/// Let spawned tasks run until they are all idle.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn subscribe_handshakes_and_delivers_in_order() {
    let mut h = Harness::new(0);
    let (handler, seen) = recorder();
    h.manager.subscribe(handler);
    assert_eq!(h.manager.state(), ConnectionState::Connecting);

    let mut server = h.next_server().await;
    assert_eq!(h.manager.state(), ConnectionState::Open);

    let handshake = server.outbound.recv().await.unwrap();
    let handshake: serde_json::Value = serde_json::from_str(&handshake).unwrap();
    assert_eq!(handshake["method"], "SUBSCRIBE");
    assert_eq!(
        handshake["params"],
        serde_json::json!(["btcusdt@trade", "ethusdt@trade"])
    );

    server.send(r#"{"result":null,"id":1}"#);
    server.trade("BTCUSDT", "68100.00");
    server.send("garbage");
    server.trade("SOLUSDT", "150.00");
    server.trade("ETHUSDT", "3800.50");
    server.trade("BTCUSDT", "68200.00");
    settle().await;

    let seen = seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            PriceUpdate { instrument: Instrument::BtcUsd, price: 68100.0 },
            PriceUpdate { instrument: Instrument::EthUsd, price: 3800.5 },
            PriceUpdate { instrument: Instrument::BtcUsd, price: 68200.0 },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn resubscribe_while_open_keeps_one_connection() {
    let mut h = Harness::new(0);
    let (first, first_seen) = recorder();
    let (second, second_seen) = recorder();

    h.manager.subscribe(first);
    let server = h.next_server().await;
    h.manager.subscribe(second);
    settle().await;

    assert_eq!(h.attempts(), 1);
    assert_eq!(h.manager.state(), ConnectionState::Open);

    server.trade("BTCUSDT", "1.5");
    settle().await;
    assert!(first_seen.lock().unwrap().is_empty(), "last subscriber wins");
    assert_eq!(second_seen.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn reconnects_after_fixed_delay_while_subscribed() {
    let mut h = Harness::new(0);
    let (handler, seen) = recorder();
    h.manager.subscribe(handler);
    let server = h.next_server().await;

    drop(server); // server-side close
    settle().await;
    assert_eq!(h.manager.state(), ConnectionState::Disconnected);

    tokio::time::sleep(DELAY - Duration::from_millis(100)).await;
    assert_eq!(h.attempts(), 1, "no reconnect before the delay");

    let server = h.next_server().await;
    assert_eq!(h.attempts(), 2);
    assert_eq!(h.manager.state(), ConnectionState::Open);

    server.trade("ETHUSDT", "3900");
    settle().await;
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unsubscribe_cancels_scheduled_reconnect() {
    let mut h = Harness::new(0);
    let (handler, seen) = recorder();
    h.manager.subscribe(handler);
    let server = h.next_server().await;

    drop(server);
    settle().await; // reconnect now scheduled
    h.manager.unsubscribe();

    tokio::time::sleep(DELAY * 3).await;
    assert_eq!(h.attempts(), 1);
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(h.manager.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn unsubscribe_closes_normally_and_silences_handler() {
    let mut h = Harness::new(0);
    let (handler, seen) = recorder();
    h.manager.subscribe(handler);
    let server = h.next_server().await;

    h.manager.unsubscribe();
    assert_eq!(h.manager.state(), ConnectionState::Closing);
    let _ = server.inbound.send(Ok(Frame::Text(
        r#"{"e":"trade","s":"BTCUSDT","p":"1"}"#.into(),
    )));
    settle().await;

    assert!(server.closed_by_client.load(Ordering::SeqCst));
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(h.manager.state(), ConnectionState::Disconnected);

    tokio::time::sleep(DELAY * 2).await;
    assert_eq!(h.attempts(), 1, "intentional close must not reconnect");
}

#[tokio::test(start_paused = true)]
async fn teardown_without_connection_is_noop() {
    let h = Harness::new(0);
    h.manager.teardown();
    h.manager.teardown();
    assert_eq!(h.manager.state(), ConnectionState::Disconnected);
    assert_eq!(h.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_connect_retries_after_delay() {
    let mut h = Harness::new(2);
    let (handler, _seen) = recorder();
    h.manager.subscribe(handler);
    settle().await;
    assert_eq!(h.attempts(), 1);
    assert_eq!(h.manager.state(), ConnectionState::Disconnected);

    let _server = h.next_server().await;
    assert_eq!(h.attempts(), 3);
    assert_eq!(h.manager.state(), ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn transport_error_alone_does_not_reconnect() {
    let mut h = Harness::new(0);
    let (handler, seen) = recorder();
    h.manager.subscribe(handler);
    let server = h.next_server().await;

    server
        .inbound
        .send(Err(Error::WebSocket("reset by peer".into())))
        .unwrap();
    server.trade("BTCUSDT", "70000");
    tokio::time::sleep(DELAY * 2).await;

    assert_eq!(h.attempts(), 1);
    assert_eq!(h.manager.state(), ConnectionState::Open);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn resubscribe_during_pending_reconnect_connects_immediately() {
    let mut h = Harness::new(0);
    let (handler, _) = recorder();
    h.manager.subscribe(handler);
    let server = h.next_server().await;
    drop(server);
    settle().await;

    let (again, seen) = recorder();
    h.manager.subscribe(again);
    let server = h.next_server().await;
    assert_eq!(h.attempts(), 2);

    // The retired timer must not open a third connection.
    tokio::time::sleep(DELAY * 2).await;
    assert_eq!(h.attempts(), 2);

    server.trade("BTCUSDT", "68000");
    settle().await;
    assert_eq!(seen.lock().unwrap().len(), 1);
}
