pub mod stream;
pub mod wire;

pub use stream::{FeedSettings, StreamManager};
