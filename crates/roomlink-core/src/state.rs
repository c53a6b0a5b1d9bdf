use crate::bus::EventBus;
use roomlink_types::{
    ActuatorStatus, ChartPoint, FrameEncoding, ImageFrame, SensorKind, SensorReading, SensorState,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::{broadcast, watch};
use tracing::trace;

/// 传输层连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    Offline,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

/// 供展示层读取的仪表盘状态快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardState {
    pub connection: ConnectionStatus,

    /// 最近一次传输层错误
    pub transport_error: Option<String>,

    /// 推送路径聚合出的传感器状态
    pub sensors: SensorState,

    pub image: Option<ImageFrame>,

    pub actuator: Option<ActuatorStatus>,

    /// 电机状态解析失败等需要提示的错误
    pub actuator_error: Option<String>,

    /// 快照路径推导出的传感器状态
    pub snapshot: Option<SensorState>,

    /// 文档存储错误，与传输层错误分开
    pub snapshot_error: Option<String>,

    /// 推送路径的滚动窗口
    pub charts: BTreeMap<SensorKind, Vec<ChartPoint>>,

    /// 由文档窗口推导的历史曲线
    pub snapshot_charts: BTreeMap<SensorKind, Vec<ChartPoint>>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            connection: ConnectionStatus::Connecting,
            transport_error: None,
            sensors: SensorState::new(),
            image: None,
            actuator: None,
            actuator_error: None,
            snapshot: None,
            snapshot_error: None,
            charts: BTreeMap::new(),
            snapshot_charts: BTreeMap::new(),
        }
    }
}

impl DashboardState {
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }
}

/// 仪表盘增量事件
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    ConnectionChanged(ConnectionStatus),
    TransportError(String),
    SensorUpdated(SensorReading),
    ImageUpdated { bytes: usize, encoding: FrameEncoding },
    ActuatorUpdated(ActuatorStatus),
    DecodeFailed { topic: String, reason: String, excerpt: String },
    SnapshotUpdated(SensorState),
    SnapshotFailed(String),
    CommandFailed(String),
}

/// 状态中心：最新快照走 watch，增量事件走 EventBus
#[derive(Clone)]
pub struct StateHub {
    state: watch::Sender<DashboardState>,
    events: EventBus<DashboardEvent>,
}

impl StateHub {
    pub fn new(event_capacity: usize) -> Self {
        let (state, _) = watch::channel(DashboardState::default());
        Self {
            state,
            events: EventBus::new(event_capacity),
        }
    }

    /// 当前状态的只读副本
    pub fn snapshot(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut DashboardState),
    {
        self.state.send_modify(f);
    }

    /// 发布事件；没有订阅者时直接丢弃
    pub fn emit(&self, event: DashboardEvent) {
        if self.events.publish(event).is_err() {
            trace!("No dashboard event subscribers");
        }
    }
}

impl Default for StateHub {
    fn default() -> Self {
        Self::new(256)
    }
}
