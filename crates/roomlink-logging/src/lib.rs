pub mod init;
pub mod sampler;

pub use init::{init_logging, LoggingError};
pub use sampler::{LogSampler, SamplingStrategy};
