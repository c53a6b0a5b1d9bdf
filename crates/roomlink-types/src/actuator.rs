use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 门电机状态（由设备上报）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorState {
    Idle,
    Open,
    Closed,
    Opening,
    Closing,
    Stopped,
    Partial,
    Error,
}

impl ActuatorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActuatorState::Idle => "idle",
            ActuatorState::Open => "open",
            ActuatorState::Closed => "closed",
            ActuatorState::Opening => "opening",
            ActuatorState::Closing => "closing",
            ActuatorState::Stopped => "stopped",
            ActuatorState::Partial => "partial",
            ActuatorState::Error => "error",
        }
    }

    /// 是否处于运动中的状态
    pub fn is_transitional(&self) -> bool {
        matches!(self, ActuatorState::Opening | ActuatorState::Closing)
    }
}

impl fmt::Display for ActuatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 电机速度档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotorSpeed {
    #[default]
    Fast,
    Normal,
}

impl MotorSpeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            MotorSpeed::Fast => "fast",
            MotorSpeed::Normal => "normal",
        }
    }
}

/// 步进电机位置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActuatorPosition {
    pub current_steps: i64,
    pub total_steps: i64,
    pub percentage: f64,
    pub is_moving: bool,
}

impl ActuatorPosition {
    /// 百分比限制在 0..=100
    pub fn clamped(mut self) -> Self {
        if self.percentage.is_nan() {
            self.percentage = 0.0;
        }
        self.percentage = self.percentage.clamp(0.0, 100.0);
        self
    }
}

/// 电机状态报告，整体覆盖，不与上一条合并
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorStatus {
    pub state: ActuatorState,

    #[serde(default)]
    pub message: String,

    /// Unix 时间（秒，可带小数）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<ActuatorPosition>,
}

impl ActuatorStatus {
    pub fn new(state: ActuatorState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
            timestamp: Some(Utc::now().timestamp_millis() as f64 / 1000.0),
            position: None,
        }
    }

    pub fn with_position(mut self, position: ActuatorPosition) -> Self {
        self.position = Some(position);
        self
    }

    /// 设备上报时间
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        let ts = self.timestamp?;
        if !ts.is_finite() || ts < 0.0 {
            return None;
        }
        let secs = ts.trunc() as i64;
        let nanos = (ts.fract() * 1_000_000_000.0) as u32;
        DateTime::<Utc>::from_timestamp(secs, nanos)
    }

    /// 最近一次位置报告是否表明电机在运动
    pub fn is_moving(&self) -> bool {
        self.position.map(|p| p.is_moving).unwrap_or(false)
    }
}
