use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置源读取或反序列化失败
    #[error("Failed to load config: {0}")]
    Load(#[from] config::ConfigError),

    /// 配置项校验失败
    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ConfigError::Invalid(msg.into())
    }
}
