use crate::channel::CommandChannel;
use crate::command::ActuatorCommand;
use crate::error::{CommandError, Result};
use async_trait::async_trait;
use roomlink_transport::{QosLevel, TransportHandle};
use tracing::{info, warn};

/// MQTT 指令通道，复用连接器的发布句柄
pub struct MqttCommandChannel {
    handle: TransportHandle,

    /// 控制主题
    topic: String,

    qos: QosLevel,
}

impl MqttCommandChannel {
    pub fn new(handle: TransportHandle, topic: impl Into<String>) -> Self {
        Self {
            handle,
            topic: topic.into(),
            qos: QosLevel::AtLeastOnce,
        }
    }

    pub fn with_qos(mut self, qos: QosLevel) -> Self {
        self.qos = qos;
        self
    }
}

#[async_trait]
impl CommandChannel for MqttCommandChannel {
    async fn send_command(&self, command: &ActuatorCommand) -> Result<()> {
        let payload = command.to_payload()?;

        match self.handle.publish(&self.topic, payload, self.qos).await {
            Ok(()) => {
                info!(
                    action = %command.action,
                    speed = command.speed.as_str(),
                    topic = %self.topic,
                    "Command sent via MQTT"
                );
                Ok(())
            }
            Err(e) => {
                warn!(action = %command.action, error = %e, "Failed to publish motor command");
                Err(CommandError::NotSent(e.to_string()))
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.handle.is_connected()
    }
}
