pub mod resource;
pub mod signal;

pub use resource::{CleanupReport, Resource, ResourceError, ResourceManager};
pub use signal::{ShutdownSignal, SignalHandler};
