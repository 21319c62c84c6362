use std::sync::Arc;

use tokio::sync::mpsc;

use common::{ConnectionState, PriceUpdate};

use crate::binance::StreamManager;

/// Callback receiving every price update, in arrival order.
pub type UpdateHandler = Arc<dyn Fn(PriceUpdate) + Send + Sync>;

/// The subscribe/unsubscribe seam the dashboard attaches to.
///
/// One subscriber at a time: a second `subscribe` replaces the first.
pub trait PriceFeed: Send + Sync {
    /// Register `handler` and start streaming if not already.
    fn subscribe(&self, handler: UpdateHandler);

    /// Stop streaming. No handler call happens after this returns.
    fn unsubscribe(&self);

    fn connection_state(&self) -> ConnectionState;
}

impl PriceFeed for StreamManager {
    fn subscribe(&self, handler: UpdateHandler) {
        StreamManager::subscribe(self, handler);
    }

    fn unsubscribe(&self) {
        self.teardown();
    }

    fn connection_state(&self) -> ConnectionState {
        self.state()
    }
}

/// Handler that forwards every update into `tx`.
pub fn channel_handler(tx: mpsc::UnboundedSender<PriceUpdate>) -> UpdateHandler {
    Arc::new(move |update| {
        // Receiver gone means the consumer is shutting down
        let _ = tx.send(update);
    })
}

/// Subscribe `feed` and receive its updates as a channel instead of a callback.
pub fn subscribe_channel(feed: &dyn PriceFeed) -> mpsc::UnboundedReceiver<PriceUpdate> {
    let (tx, rx) = mpsc::unbounded_channel();
    feed.subscribe(channel_handler(tx));
    rx
}
