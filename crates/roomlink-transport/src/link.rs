use crate::error::Result;
use crate::types::QosLevel;
use async_trait::async_trait;
use bytes::Bytes;
use rumqttc::{AsyncClient, Event, EventLoop, Outgoing, Packet};

/// 网络事件循环产出的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Connected,
    Message { topic: String, payload: Bytes },
    /// 代理主动断开
    Disconnected,
    /// 本端的 Disconnect 报文已发出
    DisconnectSent,
    /// 其他报文（出站、心跳等）
    Idle,
}

/// 代理客户端：订阅、发布、断开
#[async_trait]
pub trait BrokerClient: Send + Sync {
    async fn subscribe(&self, topic: &str, qos: QosLevel) -> Result<()>;

    async fn unsubscribe(&self, topic: &str) -> Result<()>;

    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: QosLevel) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;
}

/// 网络事件循环
///
/// 出错后再次调用 `poll` 即发起重连。
#[async_trait]
pub trait LinkDriver: Send {
    async fn poll(&mut self) -> Result<LinkEvent>;
}

#[async_trait]
impl BrokerClient for AsyncClient {
    async fn subscribe(&self, topic: &str, qos: QosLevel) -> Result<()> {
        AsyncClient::subscribe(self, topic, qos.into()).await?;
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<()> {
        AsyncClient::unsubscribe(self, topic).await?;
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: QosLevel) -> Result<()> {
        AsyncClient::publish(self, topic, qos.into(), false, payload).await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        AsyncClient::disconnect(self).await?;
        Ok(())
    }
}

#[async_trait]
impl LinkDriver for EventLoop {
    async fn poll(&mut self) -> Result<LinkEvent> {
        let event = EventLoop::poll(self).await?;
        Ok(match event {
            Event::Incoming(Packet::ConnAck(_)) => LinkEvent::Connected,
            Event::Incoming(Packet::Publish(publish)) => LinkEvent::Message {
                topic: publish.topic,
                payload: publish.payload,
            },
            Event::Incoming(Packet::Disconnect) => LinkEvent::Disconnected,
            Event::Outgoing(Outgoing::Disconnect) => LinkEvent::DisconnectSent,
            Event::Incoming(_) | Event::Outgoing(_) => LinkEvent::Idle,
        })
    }
}
