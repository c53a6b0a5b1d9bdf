use bytes::Bytes;

/// 消息服务质量等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QosLevel {
    AtMostOnce,
    #[default]
    AtLeastOnce,
    ExactlyOnce,
}

impl QosLevel {
    pub fn from_u8(level: u8) -> Option<Self> {
        match level {
            0 => Some(QosLevel::AtMostOnce),
            1 => Some(QosLevel::AtLeastOnce),
            2 => Some(QosLevel::ExactlyOnce),
            _ => None,
        }
    }
}

impl From<QosLevel> for rumqttc::QoS {
    fn from(qos: QosLevel) -> Self {
        match qos {
            QosLevel::AtMostOnce => rumqttc::QoS::AtMostOnce,
            QosLevel::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
            QosLevel::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
        }
    }
}

/// 连接器对外发出的生命周期事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    /// 进入离线状态，重连循环开始
    Offline,
    MessageReceived { topic: String, payload: Bytes },
    TransportError(String),
}
