use crate::command::ActuatorAction;
use chrono::{DateTime, Utc};
use roomlink_types::{ActuatorPosition, ActuatorState, ActuatorStatus};
use std::fmt;
use tracing::debug;

/// 指令被拦截的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    Disconnected,
    AlreadyOpening,
    AlreadyClosing,
    NotMoving,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            BlockReason::Disconnected => "transport is disconnected",
            BlockReason::AlreadyOpening => "door is already opening",
            BlockReason::AlreadyClosing => "door is already closing",
            BlockReason::NotMoving => "door is not moving",
        };
        f.write_str(reason)
    }
}

/// 各指令当前是否可下发
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandGuards {
    pub open: bool,
    pub close: bool,
    pub stop: bool,
    pub status: bool,
}

impl CommandGuards {
    pub fn allows(&self, action: ActuatorAction) -> bool {
        match action {
            ActuatorAction::Open => self.open,
            ActuatorAction::Close => self.close,
            ActuatorAction::Stop => self.stop,
            ActuatorAction::Status => self.status,
        }
    }
}

/// 本地预测状态，下一条设备状态到达即作废
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub state: ActuatorState,
    pub predicted_at: DateTime<Utc>,
}

/// 门电机状态机
///
/// 状态只由设备上报驱动；本地只负责判断指令能否下发。
#[derive(Debug, Default)]
pub struct ActuatorMachine {
    status: Option<ActuatorStatus>,
    prediction: Option<Prediction>,
    optimistic: bool,
}

impl ActuatorMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 下发开/关指令后记录本地预测
    pub fn with_optimistic(mut self, optimistic: bool) -> Self {
        self.optimistic = optimistic;
        self
    }

    /// 应用设备上报的状态，整体覆盖上一条
    pub fn apply_status(&mut self, status: ActuatorStatus) {
        if let Some(prediction) = self.prediction.take() {
            debug!(
                predicted = %prediction.state,
                reported = %status.state,
                "Prediction replaced by device status"
            );
        }
        self.status = Some(status);
    }

    pub fn status(&self) -> Option<&ActuatorStatus> {
        self.status.as_ref()
    }

    /// 设备最近一次上报的状态
    pub fn reported_state(&self) -> Option<ActuatorState> {
        self.status.as_ref().map(|s| s.state)
    }

    pub fn prediction(&self) -> Option<Prediction> {
        self.prediction
    }

    /// 展示用状态：有预测时取预测，否则取上报
    pub fn display_state(&self) -> Option<ActuatorState> {
        self.prediction
            .map(|p| p.state)
            .or_else(|| self.reported_state())
    }

    pub fn is_moving(&self) -> bool {
        self.status.as_ref().map(|s| s.is_moving()).unwrap_or(false)
    }

    pub fn position(&self) -> Option<ActuatorPosition> {
        self.status.as_ref().and_then(|s| s.position)
    }

    /// 开度估计（百分比）
    ///
    /// 优先使用位置报告；没有位置时按终态推断。
    pub fn estimated_percentage(&self) -> Option<f64> {
        if let Some(position) = self.position() {
            return Some(position.percentage);
        }
        match self.reported_state()? {
            ActuatorState::Open => Some(100.0),
            ActuatorState::Closed => Some(0.0),
            _ => None,
        }
    }

    pub fn check(&self, action: ActuatorAction, connected: bool) -> Result<(), BlockReason> {
        if !connected {
            return Err(BlockReason::Disconnected);
        }

        let state = self.reported_state();
        match action {
            ActuatorAction::Open if state == Some(ActuatorState::Opening) => {
                Err(BlockReason::AlreadyOpening)
            }
            ActuatorAction::Close if state == Some(ActuatorState::Closing) => {
                Err(BlockReason::AlreadyClosing)
            }
            ActuatorAction::Stop if !self.is_moving() => Err(BlockReason::NotMoving),
            _ => Ok(()),
        }
    }

    pub fn guards(&self, connected: bool) -> CommandGuards {
        CommandGuards {
            open: self.check(ActuatorAction::Open, connected).is_ok(),
            close: self.check(ActuatorAction::Close, connected).is_ok(),
            stop: self.check(ActuatorAction::Stop, connected).is_ok(),
            status: self.check(ActuatorAction::Status, connected).is_ok(),
        }
    }

    /// 指令成功发出后调用
    pub fn record_sent(&mut self, action: ActuatorAction) -> Option<Prediction> {
        if !self.optimistic {
            return None;
        }

        let state = match action {
            ActuatorAction::Open => ActuatorState::Opening,
            ActuatorAction::Close => ActuatorState::Closing,
            ActuatorAction::Stop | ActuatorAction::Status => return None,
        };
        let prediction = Prediction {
            state,
            predicted_at: Utc::now(),
        };
        self.prediction = Some(prediction);
        Some(prediction)
    }
}
