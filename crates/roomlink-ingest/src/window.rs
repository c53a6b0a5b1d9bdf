use chrono::{DateTime, Utc};
use roomlink_types::{ChartPoint, SensorKind};
use std::collections::{BTreeMap, VecDeque};

/// 每种类型默认保留的图表点数
pub const DEFAULT_CHART_SIZE: usize = 20;

/// 滚动窗口缓冲
///
/// 值未变化时不追加；超出容量时从头部淘汰。
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    series: BTreeMap<SensorKind, VecDeque<ChartPoint>>,
    last_pushed: BTreeMap<SensorKind, f64>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            series: BTreeMap::new(),
            last_pushed: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 追加数据点，返回是否实际写入
    pub fn push(&mut self, kind: SensorKind, value: f64, timestamp: DateTime<Utc>) -> bool {
        if self.last_pushed.get(&kind) == Some(&value) {
            return false;
        }
        self.last_pushed.insert(kind, value);

        let series = self.series.entry(kind).or_default();
        series.push_back(ChartPoint { timestamp, value });
        while series.len() > self.capacity {
            series.pop_front();
        }
        true
    }

    /// 按时间从旧到新返回
    pub fn series(&self, kind: SensorKind) -> impl Iterator<Item = &ChartPoint> + '_ {
        self.series.get(&kind).into_iter().flat_map(|s| s.iter())
    }

    pub fn values(&self, kind: SensorKind) -> Vec<f64> {
        self.series(kind).map(|p| p.value).collect()
    }

    pub fn len(&self, kind: SensorKind) -> usize {
        self.series.get(&kind).map(VecDeque::len).unwrap_or(0)
    }

    /// 所有类型的序列副本
    pub fn to_charts(&self) -> BTreeMap<SensorKind, Vec<ChartPoint>> {
        self.series
            .iter()
            .map(|(kind, series)| (*kind, series.iter().copied().collect()))
            .collect()
    }

    pub fn clear(&mut self) {
        self.series.clear();
        self.last_pushed.clear();
    }
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CHART_SIZE)
    }
}
