use crate::endpoint::BrokerEndpoint;
use crate::error::{Result, TransportError};
use crate::link::{BrokerClient, LinkDriver, LinkEvent};
use crate::metrics::TransportMetrics;
use crate::reconnect::ReconnectPolicy;
use crate::types::{QosLevel, TransportEvent};
use roomlink_config::TransportConfig;
use rumqttc::{AsyncClient, MqttOptions};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// 停止前等待 Disconnect 报文发出的最长时间
const DISCONNECT_FLUSH: Duration = Duration::from_millis(500);

/// 连接参数
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub endpoint: BrokerEndpoint,
    pub client_id: String,
    pub keep_alive: Duration,
    pub reconnect: ReconnectPolicy,
    pub channel_capacity: usize,
}

impl ConnectOptions {
    pub fn from_config(config: &TransportConfig) -> Result<Self> {
        Ok(Self {
            endpoint: BrokerEndpoint::parse(&config.endpoint)?,
            client_id: generate_client_id(&config.client_id_prefix),
            keep_alive: Duration::from_secs(config.keep_alive_secs.max(1)),
            reconnect: ReconnectPolicy::fixed(Duration::from_millis(config.reconnect_interval_ms)),
            channel_capacity: config.channel_capacity.max(1),
        })
    }

    fn mqtt_options(&self) -> MqttOptions {
        let mut mqtt_options = MqttOptions::new(
            self.client_id.clone(),
            self.endpoint.broker_addr(),
            self.endpoint.port,
        );
        mqtt_options.set_keep_alive(self.keep_alive);
        mqtt_options.set_clean_session(true);
        mqtt_options.set_transport(self.endpoint.transport());
        mqtt_options
    }
}

/// 生成随机客户端 ID：`<prefix>_<8 位十六进制>`
pub fn generate_client_id(prefix: &str) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &random[..8])
}

#[derive(Debug, Clone)]
struct Subscription {
    topic: String,
    qos: QosLevel,
}

/// 连接器与事件循环共享的状态
struct Shared {
    connected: AtomicBool,
    /// `shutdown` 已排队 Disconnect，事件循环停止前需发出
    disconnect_queued: AtomicBool,
    subscriptions: Mutex<Vec<Subscription>>,
    metrics: TransportMetrics,
}

impl Shared {
    /// 标记已连接，返回需要重新订阅的主题
    fn mark_connected(&self) -> Vec<Subscription> {
        let subscriptions = self.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        self.connected.store(true, Ordering::SeqCst);
        subscriptions.clone()
    }

    /// 标记断开，返回之前是否处于连接状态
    fn mark_disconnected(&self) -> bool {
        self.connected.swap(false, Ordering::SeqCst)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// 发布句柄，可克隆后交给指令通道使用
#[derive(Clone)]
pub struct TransportHandle {
    client: Arc<dyn BrokerClient>,
    shared: Arc<Shared>,
}

impl TransportHandle {
    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    /// 发布消息；离线时立即失败，不排队
    pub async fn publish(&self, topic: &str, payload: Vec<u8>, qos: QosLevel) -> Result<()> {
        if !self.shared.is_connected() {
            self.shared.metrics.record_publish_failure();
            return Err(TransportError::NotConnected);
        }

        match self.client.publish(topic, payload, qos).await {
            Ok(()) => {
                self.shared.metrics.record_publish();
                debug!(topic = %topic, "Message published");
                Ok(())
            }
            Err(e) => {
                self.shared.metrics.record_publish_failure();
                warn!(topic = %topic, error = %e, "Publish failed");
                Err(e)
            }
        }
    }

    pub fn metrics(&self) -> TransportMetrics {
        self.shared.metrics.clone()
    }
}

/// 传输连接器
///
/// 持有唯一的代理连接，后台任务负责事件循环与固定间隔重连。
pub struct Connector {
    handle: TransportHandle,
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl Connector {
    /// 连接 MQTT 代理，需在 tokio 运行时内调用
    pub fn connect(options: ConnectOptions) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (client, eventloop) = AsyncClient::new(options.mqtt_options(), 10);

        info!(
            endpoint = %options.endpoint.url,
            client_id = %options.client_id,
            reconnect_interval = ?options.reconnect.interval(),
            "Connecting to MQTT broker"
        );

        Self::with_link(client, eventloop, options.reconnect, options.channel_capacity)
    }

    /// 使用任意客户端与事件循环实现构建连接器
    pub fn with_link<C, D>(
        client: C,
        driver: D,
        policy: ReconnectPolicy,
        channel_capacity: usize,
    ) -> (Self, mpsc::Receiver<TransportEvent>)
    where
        C: BrokerClient + 'static,
        D: LinkDriver + 'static,
    {
        let client: Arc<dyn BrokerClient> = Arc::new(client);
        let shared = Arc::new(Shared {
            connected: AtomicBool::new(false),
            disconnect_queued: AtomicBool::new(false),
            subscriptions: Mutex::new(Vec::new()),
            metrics: TransportMetrics::new(),
        });

        let (events_tx, events_rx) = mpsc::channel(channel_capacity);
        let (stop_tx, stop_rx) = watch::channel(false);

        let task = tokio::spawn(run_event_loop(
            driver,
            client.clone(),
            shared.clone(),
            policy,
            events_tx,
            stop_rx,
        ));

        let connector = Self {
            handle: TransportHandle { client, shared },
            stop_tx,
            task: Some(task),
        };
        (connector, events_rx)
    }

    /// 订阅主题；离线时先记录，连接建立后自动订阅
    pub async fn subscribe(&self, topic: &str, qos: QosLevel) -> Result<()> {
        let connected = {
            let mut subscriptions = self
                .handle
                .shared
                .subscriptions
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if !subscriptions.iter().any(|s| s.topic == topic) {
                subscriptions.push(Subscription {
                    topic: topic.to_string(),
                    qos,
                });
            }
            self.handle.shared.is_connected()
        };

        if connected {
            self.handle.client.subscribe(topic, qos).await?;
            info!(topic = %topic, "Subscribed");
        } else {
            debug!(topic = %topic, "Subscription recorded, pending connection");
        }
        Ok(())
    }

    pub async fn publish(&self, topic: &str, payload: Vec<u8>, qos: QosLevel) -> Result<()> {
        self.handle.publish(topic, payload, qos).await
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_connected()
    }

    pub fn handle(&self) -> TransportHandle {
        self.handle.clone()
    }

    pub fn metrics(&self) -> TransportMetrics {
        self.handle.metrics()
    }

    /// 取消订阅、断开连接并停止事件循环
    pub async fn shutdown(mut self) -> Result<()> {
        let subscriptions: Vec<Subscription> = self
            .handle
            .shared
            .subscriptions
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|e| e.into_inner().clone());

        let mut result = Ok(());
        if self.handle.is_connected() {
            for subscription in &subscriptions {
                if let Err(e) = self.handle.client.unsubscribe(&subscription.topic).await {
                    warn!(topic = %subscription.topic, error = %e, "Unsubscribe failed");
                }
            }
            result = self.handle.client.disconnect().await;
            if result.is_ok() {
                self.handle.shared.disconnect_queued.store(true, Ordering::SeqCst);
            }
        }

        self.handle.shared.mark_disconnected();
        let _ = self.stop_tx.send(true);

        if let Some(task) = self.task.take() {
            match tokio::time::timeout(Duration::from_secs(2), task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Transport task failed"),
                Err(_) => warn!("Transport task did not stop in time"),
            }
        }

        info!("Transport connector shut down");
        result
    }
}

impl Drop for Connector {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// 事件循环：逐条转发事件，断线后按固定间隔重连
async fn run_event_loop<D: LinkDriver>(
    mut driver: D,
    client: Arc<dyn BrokerClient>,
    shared: Arc<Shared>,
    policy: ReconnectPolicy,
    events: mpsc::Sender<TransportEvent>,
    mut stop: watch::Receiver<bool>,
) {
    let mut offline = false;
    let mut attempt: u64 = 0;

    loop {
        let polled = tokio::select! {
            _ = stop.changed() => None,
            polled = driver.poll() => Some(polled),
        };
        let Some(polled) = polled else {
            if shared.disconnect_queued.load(Ordering::SeqCst) {
                flush_disconnect(&mut driver).await;
            }
            break;
        };

        let lost = match polled {
            Ok(LinkEvent::Connected) => {
                offline = false;
                attempt = 0;
                shared.metrics.record_connection();
                info!("Connected to MQTT broker");

                for subscription in shared.mark_connected() {
                    if let Err(e) = client.subscribe(&subscription.topic, subscription.qos).await {
                        warn!(topic = %subscription.topic, error = %e, "Resubscribe failed");
                        if !emit(&events, TransportEvent::TransportError(e.to_string())).await {
                            return;
                        }
                    }
                }

                if !emit(&events, TransportEvent::Connected).await {
                    return;
                }
                None
            }
            Ok(LinkEvent::Message { topic, payload }) => {
                shared.metrics.record_message_received(payload.len());
                if !emit(&events, TransportEvent::MessageReceived { topic, payload }).await {
                    return;
                }
                None
            }
            Ok(LinkEvent::Disconnected) => Some(None),
            Ok(LinkEvent::DisconnectSent) => {
                if shared.disconnect_queued.load(Ordering::SeqCst) {
                    debug!("Disconnect flushed to broker");
                    break;
                }
                None
            }
            Ok(LinkEvent::Idle) => None,
            Err(e) => Some(Some(e)),
        };

        if let Some(reason) = lost {
            if let Some(e) = &reason {
                warn!(error = %e, retry_in = ?policy.interval(), "MQTT connection error");
                if !emit(&events, TransportEvent::TransportError(e.to_string())).await {
                    return;
                }
            } else {
                warn!("Broker closed the connection");
            }

            if shared.mark_disconnected() && !emit(&events, TransportEvent::Disconnected).await {
                return;
            }
            if !offline {
                offline = true;
                if !emit(&events, TransportEvent::Offline).await {
                    return;
                }
            }

            attempt += 1;
            shared.metrics.record_reconnect_attempt();
            tokio::select! {
                _ = stop.changed() => break,
                _ = tokio::time::sleep(policy.delay(attempt)) => {
                    debug!(attempt, "Reconnecting to MQTT broker");
                }
            }
        }
    }

    debug!("Transport event loop stopped");
}

/// 继续轮询直到 Disconnect 报文发出或连接结束，此间收到的消息丢弃
async fn flush_disconnect<D: LinkDriver>(driver: &mut D) {
    let flushed = tokio::time::timeout(DISCONNECT_FLUSH, async {
        loop {
            match driver.poll().await {
                Ok(LinkEvent::DisconnectSent) | Ok(LinkEvent::Disconnected) | Err(_) => break,
                Ok(_) => continue,
            }
        }
    })
    .await;

    match flushed {
        Ok(()) => debug!("Disconnect flushed to broker"),
        Err(_) => warn!("Disconnect not flushed before timeout"),
    }
}

/// 发送事件，接收端已关闭时返回 false
async fn emit(events: &mpsc::Sender<TransportEvent>, event: TransportEvent) -> bool {
    events.send(event).await.is_ok()
}
