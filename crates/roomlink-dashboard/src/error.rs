use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Config error: {0}")]
    Config(#[from] roomlink_config::ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] roomlink_transport::TransportError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] roomlink_snapshot::SnapshotError),

    #[error("Command error: {0}")]
    Command(#[from] roomlink_actuator::CommandError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
