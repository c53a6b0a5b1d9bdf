use roomlink_config::TopicSet;
use std::collections::HashMap;
use tracing::debug;

/// 入站主题对应的解码路径
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicRoute {
    SensorData,
    SensorImage,
    ActuatorStatus,
}

impl TopicRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicRoute::SensorData => "sensor-data",
            TopicRoute::SensorImage => "sensor-image",
            TopicRoute::ActuatorStatus => "actuator-status",
        }
    }
}

/// 主题路由表，启动时构建一次
#[derive(Debug, Clone, Default)]
pub struct TopicRouter {
    routes: HashMap<String, TopicRoute>,
}

impl TopicRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_topics(topics: &TopicSet) -> Self {
        Self::new()
            .with_route(&topics.sensor_data, TopicRoute::SensorData)
            .with_route(&topics.sensor_image, TopicRoute::SensorImage)
            .with_route(&topics.motor_status, TopicRoute::ActuatorStatus)
    }

    pub fn with_route(mut self, topic: impl Into<String>, route: TopicRoute) -> Self {
        let topic = topic.into();
        debug!(topic = %topic, route = route.as_str(), "Topic route registered");
        self.routes.insert(topic, route);
        self
    }

    pub fn route(&self, topic: &str) -> Option<TopicRoute> {
        self.routes.get(topic).copied()
    }

    /// 所有已注册主题
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
