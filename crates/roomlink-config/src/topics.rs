use serde::{Deserialize, Serialize};

/// 主题配置：命名空间 + 各逻辑主题的后缀
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TopicConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_sensor_data")]
    pub sensor_data: String,

    #[serde(default = "default_sensor_image")]
    pub sensor_image: String,

    #[serde(default = "default_motor_status")]
    pub motor_status: String,

    #[serde(default = "default_motor_control")]
    pub motor_control: String,
}

/// 展开后的完整主题名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSet {
    pub sensor_data: String,
    pub sensor_image: String,
    pub motor_status: String,
    pub motor_control: String,
}

impl TopicConfig {
    /// 拼接命名空间，得到完整主题
    pub fn resolve(&self) -> TopicSet {
        TopicSet {
            sensor_data: self.join(&self.sensor_data),
            sensor_image: self.join(&self.sensor_image),
            motor_status: self.join(&self.motor_status),
            motor_control: self.join(&self.motor_control),
        }
    }

    fn join(&self, suffix: &str) -> String {
        let namespace = self.namespace.trim_end_matches('/');
        let suffix = suffix.trim_start_matches('/');
        if namespace.is_empty() {
            suffix.to_string()
        } else {
            format!("{}/{}", namespace, suffix)
        }
    }
}

impl TopicSet {
    /// 需要订阅的入站主题
    pub fn inbound(&self) -> [&str; 3] {
        [&self.sensor_data, &self.sensor_image, &self.motor_status]
    }
}

fn default_namespace() -> String {
    "roomlink/site-01".to_string()
}

fn default_sensor_data() -> String {
    "sensor/data".to_string()
}

fn default_sensor_image() -> String {
    "sensor/image".to_string()
}

fn default_motor_status() -> String {
    "motor/status".to_string()
}

fn default_motor_control() -> String {
    "motor/control".to_string()
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            sensor_data: default_sensor_data(),
            sensor_image: default_sensor_image(),
            motor_status: default_motor_status(),
            motor_control: default_motor_control(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_default_topics() {
        let topics = TopicConfig::default().resolve();
        assert_eq!(topics.sensor_data, "roomlink/site-01/sensor/data");
        assert_eq!(topics.motor_control, "roomlink/site-01/motor/control");
        assert_eq!(topics.inbound().len(), 3);
        assert!(!topics.inbound().contains(&topics.motor_control.as_str()));
    }

    #[test]
    fn test_resolve_trims_slashes() {
        let config = TopicConfig {
            namespace: "lab/".to_string(),
            sensor_image: "/cam/frame".to_string(),
            ..Default::default()
        };
        assert_eq!(config.resolve().sensor_image, "lab/cam/frame");
    }
}
