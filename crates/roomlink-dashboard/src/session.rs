use crate::error::Result;
use crate::ingest::{IngestStats, Ingestor};
use crate::resources::{IngestResource, ListenerResource, TransportResource};
use roomlink_actuator::{
    ActuatorAction, ActuatorController, ActuatorMachine, CommandGuards, CommandOutcome,
    MqttCommandChannel,
};
use roomlink_config::{RoomlinkConfig, TopicSet};
use roomlink_core::{DashboardEvent, DashboardState, StateHub};
use roomlink_ingest::{Decoder, RollingWindow, TopicRouter};
use roomlink_shutdown::{CleanupReport, ResourceManager};
use roomlink_snapshot::{
    open_store, DocumentStore, ListenerOptions, ReadingLogger, SnapshotListener,
};
use roomlink_transport::{
    ConnectOptions, Connector, MetricsSnapshot, QosLevel, TransportEvent, TransportMetrics,
};
use roomlink_types::MotorSpeed;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{error, info, warn};

/// 记录器队列容量
const LOGGER_QUEUE: usize = 256;

/// 会话结束时的汇总
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub cleanup: CleanupReport,
    pub ingest: Option<IngestStats>,
}

/// 仪表盘会话
///
/// 启动时获取传输连接、快照监听器和接收循环，`shutdown` 按顺序释放。
/// 未调用 `shutdown` 直接释放时，各后台任务被中止。
pub struct Session {
    hub: StateHub,
    controller: ActuatorController,
    metrics: TransportMetrics,
    topics: TopicSet,
    resources: ResourceManager,
    ingest: Arc<IngestResource>,
}

impl Session {
    /// 按配置连接代理并打开文档存储
    pub async fn start(config: &RoomlinkConfig) -> Result<Self> {
        let options = ConnectOptions::from_config(&config.transport)?;
        let store = if config.snapshot.enabled {
            Some(open_store(&config.snapshot)?)
        } else {
            None
        };

        let (connector, events) = Connector::connect(options);
        Self::assemble(config, connector, events, store).await
    }

    /// 使用已建立的连接器组装会话
    pub async fn assemble(
        config: &RoomlinkConfig,
        connector: Connector,
        events: mpsc::Receiver<TransportEvent>,
        store: Option<Arc<dyn DocumentStore>>,
    ) -> Result<Self> {
        let topics = config.topics.resolve();
        let qos = QosLevel::from_u8(config.transport.qos).unwrap_or_default();

        for topic in topics.inbound() {
            if let Err(e) = connector.subscribe(topic, qos).await {
                error!(topic = %topic, error = %e, "Subscribe failed, releasing transport");
                if let Err(shutdown_err) = connector.shutdown().await {
                    warn!(error = %shutdown_err, "Transport shutdown failed");
                }
                return Err(e.into());
            }
        }

        let hub = StateHub::default();
        let metrics = connector.metrics();

        let channel = MqttCommandChannel::new(connector.handle(), topics.motor_control.clone());
        let machine = ActuatorMachine::new().with_optimistic(config.actuator.optimistic);
        let controller = ActuatorController::new(Arc::new(channel), machine)
            .with_default_speed(config.actuator.default_speed);

        let mut ingestor = Ingestor::new(
            hub.clone(),
            Decoder::new(TopicRouter::from_topics(&topics)),
            RollingWindow::new(config.window.chart_size),
            controller.clone(),
            metrics.clone(),
        );

        let mut resources = ResourceManager::new();
        if let Some(store) = store {
            if config.snapshot.log_readings {
                ingestor = ingestor.with_logger(ReadingLogger::spawn(store.clone(), LOGGER_QUEUE));
            }
            let options = ListenerOptions::from_config(&config.snapshot, config.window.chart_size);
            let listener = SnapshotListener::spawn(store, hub.clone(), options);
            resources.register(Arc::new(ListenerResource::new(listener)));
        }

        let ingest = Arc::new(IngestResource::new(tokio::spawn(ingestor.run(events))));
        resources.register(Arc::new(TransportResource::new(connector)));
        resources.register(ingest.clone());

        info!(
            namespace = %config.topics.namespace,
            resources = resources.count(),
            "Dashboard session started"
        );

        Ok(Self {
            hub,
            controller,
            metrics,
            topics,
            resources,
            ingest,
        })
    }

    pub fn hub(&self) -> &StateHub {
        &self.hub
    }

    /// 当前状态副本
    pub fn state(&self) -> DashboardState {
        self.hub.snapshot()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<DashboardState> {
        self.hub.subscribe_state()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DashboardEvent> {
        self.hub.subscribe_events()
    }

    pub fn topics(&self) -> &TopicSet {
        &self.topics
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn controller(&self) -> &ActuatorController {
        &self.controller
    }

    pub fn guards(&self) -> CommandGuards {
        self.controller.guards()
    }

    /// 下发门电机指令
    ///
    /// 发布失败时发出 `CommandFailed` 事件并返回错误，由调用方决定是否重试。
    pub async fn command(
        &self,
        action: ActuatorAction,
        speed: Option<MotorSpeed>,
    ) -> Result<CommandOutcome> {
        match self.controller.issue(action, speed).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.hub.emit(DashboardEvent::CommandFailed(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// 停止监听、断开连接并等待接收循环排空
    pub async fn shutdown(mut self) -> SessionSummary {
        info!("Shutting down dashboard session");
        let cleanup = self.resources.cleanup_all().await;
        SessionSummary {
            cleanup,
            ingest: self.ingest.stats(),
        }
    }
}
