pub mod connector;
pub mod endpoint;
pub mod error;
pub mod link;
pub mod metrics;
pub mod reconnect;
pub mod types;

pub use connector::{ConnectOptions, Connector, TransportHandle};
pub use endpoint::{BrokerEndpoint, EndpointKind};
pub use error::{Result, TransportError};
pub use link::{BrokerClient, LinkDriver, LinkEvent};
pub use metrics::{MetricsSnapshot, TransportMetrics};
pub use reconnect::ReconnectPolicy;
pub use types::{QosLevel, TransportEvent};
