pub mod binance;
pub mod facade;
pub mod transport;

pub use binance::{FeedSettings, StreamManager};
pub use facade::{channel_handler, subscribe_channel, PriceFeed, UpdateHandler};
pub use transport::{Connector, FeedTransport, Frame, TungsteniteConnector};
