pub mod error;
pub mod global;
pub mod loader;
pub mod topics;

pub use error::{ConfigError, Result};
pub use global::{
    ActuatorConfig, FirestoreConfig, LogFormat, LoggingConfig, RoomlinkConfig, SnapshotBackend,
    SnapshotConfig, TransportConfig, WindowConfig,
};
pub use loader::ConfigLoader;
pub use topics::{TopicConfig, TopicSet};
