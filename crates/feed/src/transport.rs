use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use common::{Error, Result};

/// Inbound frame, reduced to what the feed cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    /// Peer sent a close frame.
    Close,
    /// Binary, ping, pong: ignored.
    Other,
}

/// One open connection to the price feed.
#[async_trait]
pub trait FeedTransport: Send {
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Next inbound frame. `None` once the connection is gone.
    /// An `Err` is reported by the caller and does not end the session by itself.
    async fn next_frame(&mut self) -> Option<Result<Frame>>;

    /// Send a normal-closure close frame.
    async fn close(&mut self) -> Result<()>;
}

/// Opens connections to the feed.
///
/// `TungsteniteConnector` is the production implementation; tests plug in
/// an in-memory transport here.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn FeedTransport>>;
}

/// `tokio-tungstenite` WebSocket connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn FeedTransport>> {
        let url = Url::parse(url).map_err(|e| Error::WebSocket(e.to_string()))?;
        let (ws, _) = connect_async(url)
            .await
            .map_err(|e| Error::WebSocket(e.to_string()))?;
        Ok(Box::new(TungsteniteTransport { ws, failed: false }))
    }
}

struct TungsteniteTransport {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    /// Set after the first read error; the socket is treated as closed from then on.
    failed: bool,
}

#[async_trait]
impl FeedTransport for TungsteniteTransport {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.ws
            .send(Message::Text(text))
            .await
            .map_err(|e| Error::WebSocket(e.to_string()))
    }

    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        if self.failed {
            return None;
        }
        match self.ws.next().await? {
            Ok(Message::Text(text)) => Some(Ok(Frame::Text(text))),
            Ok(Message::Close(_)) => Some(Ok(Frame::Close)),
            Ok(_) => Some(Ok(Frame::Other)),
            Err(e) => {
                self.failed = true;
                Some(Err(Error::WebSocket(e.to_string())))
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "Client unsubscribed".into(),
        };
        self.ws
            .close(Some(frame))
            .await
            .map_err(|e| Error::WebSocket(e.to_string()))
    }
}
