use chrono::{DateTime, Utc};
use roomlink_types::{SensorKind, SensorReading};
use serde::{Deserialize, Serialize};

/// 文档创建时间 `{seconds, nanoseconds}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocTimestamp {
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl DocTimestamp {
    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.seconds, self.nanoseconds)
    }
}

impl From<DateTime<Utc>> for DocTimestamp {
    fn from(at: DateTime<Utc>) -> Self {
        Self {
            seconds: at.timestamp(),
            nanoseconds: at.timestamp_subsec_nanos(),
        }
    }
}

/// 读数文档 `{value, type, created_at}`
///
/// `type` 保留原始字符串，未知类型在推导时跳过。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingDocument {
    pub value: f64,

    #[serde(rename = "type")]
    pub kind: String,

    pub created_at: DocTimestamp,
}

impl ReadingDocument {
    pub fn new(kind: impl Into<String>, value: f64, created_at: impl Into<DocTimestamp>) -> Self {
        Self {
            value,
            kind: kind.into(),
            created_at: created_at.into(),
        }
    }

    /// 以设备标签记录一条读数
    pub fn from_reading(reading: &SensorReading) -> Self {
        Self::new(reading.kind.wire_tag(), reading.value, reading.observed_at)
    }

    pub fn sensor_kind(&self) -> Option<SensorKind> {
        self.kind.parse().ok()
    }
}
