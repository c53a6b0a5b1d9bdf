pub mod aggregator;
pub mod decoder;
pub mod error;
pub mod route;
pub mod window;

pub use aggregator::SensorAggregator;
pub use decoder::{DecodeFailure, DecodedMessage, Decoder};
pub use error::{DecodeError, Result};
pub use route::{TopicRoute, TopicRouter};
pub use window::{RollingWindow, DEFAULT_CHART_SIZE};
