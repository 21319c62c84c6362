pub mod advisor;
pub mod config;
pub mod error;
pub mod types;

pub use advisor::Advisor;
pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
