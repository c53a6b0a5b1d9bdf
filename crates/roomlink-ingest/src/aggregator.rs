use roomlink_types::{SensorKind, SensorReading, SensorState};
use tracing::trace;

/// 传感器状态聚合器
///
/// 每种类型只保留最后一次写入的值，不比较时间戳。
#[derive(Debug, Default)]
pub struct SensorAggregator {
    state: SensorState,
    applied: u64,
}

impl SensorAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, reading: &SensorReading) {
        self.state.set(reading.kind, reading.value);
        self.applied += 1;
        trace!(kind = %reading.kind, value = reading.value, "Sensor slot updated");
    }

    /// 当前状态的只读副本
    pub fn state(&self) -> SensorState {
        self.state
    }

    pub fn get(&self, kind: SensorKind) -> Option<f64> {
        self.state.get(kind)
    }

    /// 已应用的读数条数
    pub fn applied(&self) -> u64 {
        self.applied
    }
}
