use thiserror::Error;

/// 载荷解码错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("No route for topic: {0}")]
    UnknownTopic(String),

    #[error("Malformed JSON: {0}")]
    MalformedJson(String),

    #[error("Unknown sensor type: {0}")]
    UnknownSensorType(String),

    #[error("Invalid sensor value: {0}")]
    InvalidValue(String),

    #[error("Invalid actuator status: {0}")]
    InvalidStatus(String),
}

pub type Result<T> = std::result::Result<T, DecodeError>;

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::MalformedJson(err.to_string())
    }
}
