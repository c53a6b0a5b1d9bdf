use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 传感器类型
///
/// 设备端上报使用短标签（`temp`、`humid` ...），这里同时接受完整名称。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SensorKind {
    #[serde(rename = "temp", alias = "temperature")]
    Temperature,

    #[serde(rename = "humid", alias = "humidity")]
    Humidity,

    #[serde(rename = "sound")]
    Sound,

    #[serde(rename = "light", alias = "ldr")]
    Light,

    #[serde(rename = "aqi", alias = "airQualityIndex")]
    AirQualityIndex,

    #[serde(rename = "tvoc", alias = "totalVOC")]
    TotalVoc,

    #[serde(rename = "eco2", alias = "equivalentCO2")]
    EquivalentCo2,

    #[serde(rename = "people_count", alias = "peopleCount")]
    PeopleCount,

    #[serde(rename = "door_open", alias = "doorOpen")]
    DoorOpen,
}

impl SensorKind {
    /// 所有已知类型，顺序固定
    pub const ALL: [SensorKind; 9] = [
        SensorKind::Temperature,
        SensorKind::Humidity,
        SensorKind::Sound,
        SensorKind::Light,
        SensorKind::AirQualityIndex,
        SensorKind::TotalVoc,
        SensorKind::EquivalentCo2,
        SensorKind::PeopleCount,
        SensorKind::DoorOpen,
    ];

    /// 设备上报时使用的标签
    pub fn wire_tag(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "temp",
            SensorKind::Humidity => "humid",
            SensorKind::Sound => "sound",
            SensorKind::Light => "light",
            SensorKind::AirQualityIndex => "aqi",
            SensorKind::TotalVoc => "tvoc",
            SensorKind::EquivalentCo2 => "eco2",
            SensorKind::PeopleCount => "people_count",
            SensorKind::DoorOpen => "door_open",
        }
    }

    /// 完整名称
    pub fn name(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::Sound => "sound",
            SensorKind::Light => "light",
            SensorKind::AirQualityIndex => "airQualityIndex",
            SensorKind::TotalVoc => "totalVOC",
            SensorKind::EquivalentCo2 => "equivalentCO2",
            SensorKind::PeopleCount => "peopleCount",
            SensorKind::DoorOpen => "doorOpen",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 未知的传感器类型标签
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown sensor type: {0}")]
pub struct UnknownSensorKind(pub String);

impl FromStr for SensorKind {
    type Err = UnknownSensorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.wire_tag() == s || kind.name() == s)
            .or(match s {
                "ldr" => Some(SensorKind::Light),
                _ => None,
            })
            .ok_or_else(|| UnknownSensorKind(s.to_string()))
    }
}

/// 单条传感器读数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub kind: SensorKind,
    pub value: f64,
    pub observed_at: DateTime<Utc>,
}

impl SensorReading {
    pub fn new(kind: SensorKind, value: f64) -> Self {
        Self {
            kind,
            value,
            observed_at: Utc::now(),
        }
    }

    pub fn with_observed_at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }
}

/// 当前传感器状态，每种类型一个槽位
///
/// `None` 表示本次会话尚未收到该类型的读数。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorState {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub sound: Option<f64>,
    pub light: Option<f64>,
    pub air_quality_index: Option<f64>,
    pub total_voc: Option<f64>,
    pub equivalent_co2: Option<f64>,
    pub people_count: Option<f64>,
    pub door_open: Option<f64>,
}

impl SensorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: SensorKind) -> Option<f64> {
        *self.slot(kind)
    }

    /// 覆盖槽位（后写覆盖）
    pub fn set(&mut self, kind: SensorKind, value: f64) {
        *self.slot_mut(kind) = Some(value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (SensorKind, Option<f64>)> + '_ {
        SensorKind::ALL.iter().map(move |kind| (*kind, self.get(*kind)))
    }

    /// 已有读数的槽位数
    pub fn observed_count(&self) -> usize {
        self.iter().filter(|(_, value)| value.is_some()).count()
    }

    fn slot(&self, kind: SensorKind) -> &Option<f64> {
        match kind {
            SensorKind::Temperature => &self.temperature,
            SensorKind::Humidity => &self.humidity,
            SensorKind::Sound => &self.sound,
            SensorKind::Light => &self.light,
            SensorKind::AirQualityIndex => &self.air_quality_index,
            SensorKind::TotalVoc => &self.total_voc,
            SensorKind::EquivalentCo2 => &self.equivalent_co2,
            SensorKind::PeopleCount => &self.people_count,
            SensorKind::DoorOpen => &self.door_open,
        }
    }

    fn slot_mut(&mut self, kind: SensorKind) -> &mut Option<f64> {
        match kind {
            SensorKind::Temperature => &mut self.temperature,
            SensorKind::Humidity => &mut self.humidity,
            SensorKind::Sound => &mut self.sound,
            SensorKind::Light => &mut self.light,
            SensorKind::AirQualityIndex => &mut self.air_quality_index,
            SensorKind::TotalVoc => &mut self.total_voc,
            SensorKind::EquivalentCo2 => &mut self.equivalent_co2,
            SensorKind::PeopleCount => &mut self.people_count,
            SensorKind::DoorOpen => &mut self.door_open,
        }
    }
}

/// 图表数据点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_tags_and_names() {
        assert_eq!("temp".parse::<SensorKind>().unwrap(), SensorKind::Temperature);
        assert_eq!("temperature".parse::<SensorKind>().unwrap(), SensorKind::Temperature);
        assert_eq!("people_count".parse::<SensorKind>().unwrap(), SensorKind::PeopleCount);
        assert_eq!("totalVOC".parse::<SensorKind>().unwrap(), SensorKind::TotalVoc);
        assert_eq!("ldr".parse::<SensorKind>().unwrap(), SensorKind::Light);

        let err = "pressure".parse::<SensorKind>().unwrap_err();
        assert_eq!(err, UnknownSensorKind("pressure".to_string()));
    }

    #[test]
    fn test_serde_uses_wire_tag() {
        let json = serde_json::to_string(&SensorKind::EquivalentCo2).unwrap();
        assert_eq!(json, "\"eco2\"");

        let kind: SensorKind = serde_json::from_str("\"humidity\"").unwrap();
        assert_eq!(kind, SensorKind::Humidity);
    }

    #[test]
    fn test_sensor_state_slots() {
        let mut state = SensorState::new();
        assert_eq!(state.observed_count(), 0);
        assert!(state.iter().all(|(_, v)| v.is_none()));

        state.set(SensorKind::Sound, 41.0);
        state.set(SensorKind::Sound, 43.5);
        state.set(SensorKind::DoorOpen, 1.0);

        assert_eq!(state.get(SensorKind::Sound), Some(43.5));
        assert_eq!(state.door_open, Some(1.0));
        assert_eq!(state.get(SensorKind::Temperature), None);
        assert_eq!(state.observed_count(), 2);
    }
}
