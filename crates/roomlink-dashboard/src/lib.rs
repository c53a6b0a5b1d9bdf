pub mod error;
pub mod ingest;
pub mod resources;
pub mod session;

pub use error::{Result, SessionError};
pub use ingest::IngestStats;
pub use session::{Session, SessionSummary};
