use thiserror::Error;

/// 指令错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// 传输层未发出指令，不会自动重试
    #[error("Command not sent: {0}")]
    NotSent(String),

    #[error("Failed to encode command: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, CommandError>;

impl From<serde_json::Error> for CommandError {
    fn from(err: serde_json::Error) -> Self {
        CommandError::Encode(err.to_string())
    }
}
