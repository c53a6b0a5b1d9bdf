use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ConfigError, Result};
use crate::global::{RoomlinkConfig, SnapshotBackend};
use roomlink_types::SensorKind;

const DEFAULT_ENV_PREFIX: &str = "ROOMLINK";

const SUPPORTED_SCHEMES: [&str; 6] = ["mqtt", "tcp", "mqtts", "ssl", "ws", "wss"];

/// 配置加载器
///
/// 来源优先级：默认值 < TOML 文件 < 环境变量（`ROOMLINK__SECTION__KEY`）。
pub struct ConfigLoader {
    path: Option<PathBuf>,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// 只使用默认值和环境变量
    pub fn without_file() -> Self {
        Self {
            path: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// 加载并校验配置
    pub fn load(&self) -> Result<RoomlinkConfig> {
        let mut builder = Config::builder();

        if let Some(path) = &self.path {
            if path.exists() {
                info!(path = %path.display(), "Loading config file");
                builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
            } else {
                // 配置文件不存在时使用默认配置
                debug!(path = %path.display(), "Config file not found, using defaults");
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .separator("__")
                .try_parsing(true),
        );

        let config: RoomlinkConfig = builder.build()?.try_deserialize()?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// 校验配置
    pub fn validate(config: &RoomlinkConfig) -> Result<()> {
        if config.window.chart_size == 0 {
            return Err(ConfigError::invalid("window.chart_size must be greater than 0"));
        }

        // 窗口至少要能容纳每种类型各一条
        if config.snapshot.window_size < SensorKind::ALL.len() {
            return Err(ConfigError::invalid(format!(
                "snapshot.window_size ({}) must be at least the number of sensor types ({})",
                config.snapshot.window_size,
                SensorKind::ALL.len()
            )));
        }

        if config.snapshot.history_window_size == 0 {
            return Err(ConfigError::invalid(
                "snapshot.history_window_size must be greater than 0",
            ));
        }

        if config.transport.reconnect_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "transport.reconnect_interval_ms must be greater than 0",
            ));
        }

        if config.transport.qos > 2 {
            return Err(ConfigError::invalid(format!(
                "transport.qos must be 0, 1 or 2, got {}",
                config.transport.qos
            )));
        }

        if config.topics.namespace.trim().is_empty() {
            return Err(ConfigError::invalid("topics.namespace must not be empty"));
        }

        let endpoint = url::Url::parse(&config.transport.endpoint).map_err(|e| {
            ConfigError::invalid(format!(
                "transport.endpoint '{}' is not a valid URL: {}",
                config.transport.endpoint, e
            ))
        })?;
        if !SUPPORTED_SCHEMES.contains(&endpoint.scheme()) {
            return Err(ConfigError::invalid(format!(
                "transport.endpoint scheme '{}' is not supported",
                endpoint.scheme()
            )));
        }
        if endpoint.host_str().map_or(true, str::is_empty) {
            return Err(ConfigError::invalid("transport.endpoint must include a host"));
        }

        if config.snapshot.enabled && config.snapshot.backend == SnapshotBackend::Firestore {
            match &config.snapshot.firestore {
                Some(firestore) if !firestore.project_id.trim().is_empty() => {}
                _ => {
                    return Err(ConfigError::invalid(
                        "snapshot.firestore.project_id is required for the firestore backend",
                    ))
                }
            }
        }

        Ok(())
    }
}
