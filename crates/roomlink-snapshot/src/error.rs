use thiserror::Error;

/// 文档存储错误
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Document store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    /// 订阅已结束
    #[error("Subscription closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
