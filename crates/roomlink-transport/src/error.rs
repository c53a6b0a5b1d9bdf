use thiserror::Error;

/// 传输层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// 未连接，指令不会排队
    #[error("Not connected to broker")]
    NotConnected,

    /// 连接失败或中断
    #[error("Connection error: {0}")]
    Connection(String),

    /// 客户端或代理拒绝了请求
    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// 事件循环已停止
    #[error("Transport closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;

impl From<rumqttc::ClientError> for TransportError {
    fn from(err: rumqttc::ClientError) -> Self {
        TransportError::Rejected(err.to_string())
    }
}

impl From<rumqttc::ConnectionError> for TransportError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        TransportError::Connection(err.to_string())
    }
}
