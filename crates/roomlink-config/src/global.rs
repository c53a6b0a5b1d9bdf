use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::topics::TopicConfig;
use roomlink_types::MotorSpeed;

/// 全局配置
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RoomlinkConfig {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub topics: TopicConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub actuator: ActuatorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RoomlinkConfig {
    /// 渲染为 TOML，便于排查生效配置
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// 传输层配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TransportConfig {
    /// 代理地址，如 `mqtt://host:1883`、`wss://host:8081/mqtt`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_client_id_prefix")]
    pub client_id_prefix: String,

    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    /// 断线后固定间隔重连
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    #[serde(default = "default_qos")]
    pub qos: u8,

    /// 事件通道容量
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

/// 图表滑动窗口配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WindowConfig {
    #[serde(default = "default_chart_size")]
    pub chart_size: usize,
}

/// 文档存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotBackend {
    #[default]
    Memory,
    Firestore,
}

/// 快照对账配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SnapshotConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub backend: SnapshotBackend,

    #[serde(default = "default_collection")]
    pub collection: String,

    /// 对账时拉取的最近文档数
    #[serde(default = "default_reconcile_window")]
    pub window_size: usize,

    /// 生成历史曲线时拉取的最近文档数
    #[serde(default = "default_history_window")]
    pub history_window_size: usize,

    /// 把推送路径收到的读数写入文档存储
    #[serde(default)]
    pub log_readings: bool,

    #[serde(default)]
    pub firestore: Option<FirestoreConfig>,
}

/// Firestore REST 配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FirestoreConfig {
    pub project_id: String,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_firestore_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub bearer_token: Option<String>,

    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// 执行器配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ActuatorConfig {
    #[serde(default)]
    pub default_speed: MotorSpeed,

    /// 发送指令后立即显示预测状态
    #[serde(default)]
    pub optimistic: bool,
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

// 默认值函数
fn default_endpoint() -> String {
    "mqtt://test.mosquitto.org:1883".to_string()
}

fn default_client_id_prefix() -> String {
    "dashboard".to_string()
}

fn default_keep_alive_secs() -> u64 {
    30
}

fn default_reconnect_interval_ms() -> u64 {
    1000
}

fn default_qos() -> u8 {
    1
}

fn default_channel_capacity() -> usize {
    256
}

fn default_chart_size() -> usize {
    20
}

fn default_true() -> bool {
    true
}

fn default_collection() -> String {
    "readings".to_string()
}

fn default_reconcile_window() -> usize {
    50
}

fn default_history_window() -> usize {
    100
}

fn default_database() -> String {
    "(default)".to_string()
}

fn default_firestore_base_url() -> String {
    "https://firestore.googleapis.com/v1".to_string()
}

fn default_refresh_interval_ms() -> u64 {
    2000
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            client_id_prefix: default_client_id_prefix(),
            keep_alive_secs: default_keep_alive_secs(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            qos: default_qos(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            chart_size: default_chart_size(),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: SnapshotBackend::default(),
            collection: default_collection(),
            window_size: default_reconcile_window(),
            history_window_size: default_history_window(),
            log_readings: false,
            firestore: None,
        }
    }
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            database: default_database(),
            base_url: default_firestore_base_url(),
            bearer_token: None,
            refresh_interval_ms: default_refresh_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            default_speed: MotorSpeed::Fast,
            optimistic: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RoomlinkConfig::default();
        assert_eq!(config.transport.reconnect_interval_ms, 1000);
        assert_eq!(config.window.chart_size, 20);
        assert_eq!(config.snapshot.window_size, 50);
        assert_eq!(config.snapshot.backend, SnapshotBackend::Memory);
        assert_eq!(config.actuator.default_speed, MotorSpeed::Fast);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: RoomlinkConfig = toml::from_str(
            r#"
[transport]
endpoint = "ws://broker.local:9001/mqtt"

[snapshot]
backend = "firestore"

[snapshot.firestore]
project_id = "campus-monitor"
"#,
        )
        .unwrap();

        assert_eq!(config.transport.endpoint, "ws://broker.local:9001/mqtt");
        assert_eq!(config.transport.keep_alive_secs, 30);
        let firestore = config.snapshot.firestore.unwrap();
        assert_eq!(firestore.database, "(default)");
        assert_eq!(firestore.refresh_interval_ms, 2000);
    }

    #[test]
    fn test_render_toml() {
        let rendered = RoomlinkConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[transport]"));
        assert!(rendered.contains("chart_size = 20"));
    }
}
