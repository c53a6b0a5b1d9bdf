use crate::channel::CommandChannel;
use crate::command::{ActuatorAction, ActuatorCommand};
use crate::error::Result;
use crate::machine::{ActuatorMachine, BlockReason, CommandGuards, Prediction};
use roomlink_types::{ActuatorStatus, MotorSpeed};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// 指令下发结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandOutcome {
    Sent {
        command: ActuatorCommand,
        prediction: Option<Prediction>,
    },
    /// 被拦截，没有发出任何消息
    Blocked(BlockReason),
}

impl CommandOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, CommandOutcome::Sent { .. })
    }
}

/// 门电机控制器
///
/// 先检查拦截条件再发布指令；发布失败直接返回错误，不自动重试。
#[derive(Clone)]
pub struct ActuatorController {
    channel: Arc<dyn CommandChannel>,
    machine: Arc<Mutex<ActuatorMachine>>,
    default_speed: MotorSpeed,
}

impl ActuatorController {
    pub fn new(channel: Arc<dyn CommandChannel>, machine: ActuatorMachine) -> Self {
        Self {
            channel,
            machine: Arc::new(Mutex::new(machine)),
            default_speed: MotorSpeed::default(),
        }
    }

    pub fn with_default_speed(mut self, speed: MotorSpeed) -> Self {
        self.default_speed = speed;
        self
    }

    fn machine(&self) -> MutexGuard<'_, ActuatorMachine> {
        self.machine.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 应用设备上报状态
    pub fn apply_status(&self, status: ActuatorStatus) {
        self.machine().apply_status(status);
    }

    pub fn guards(&self) -> CommandGuards {
        let connected = self.channel.is_connected();
        self.machine().guards(connected)
    }

    /// 读取状态机
    pub fn inspect<R>(&self, f: impl FnOnce(&ActuatorMachine) -> R) -> R {
        f(&self.machine())
    }

    pub async fn open(&self, speed: Option<MotorSpeed>) -> Result<CommandOutcome> {
        self.issue(ActuatorAction::Open, speed).await
    }

    pub async fn close(&self, speed: Option<MotorSpeed>) -> Result<CommandOutcome> {
        self.issue(ActuatorAction::Close, speed).await
    }

    pub async fn stop(&self) -> Result<CommandOutcome> {
        self.issue(ActuatorAction::Stop, None).await
    }

    pub async fn request_status(&self) -> Result<CommandOutcome> {
        self.issue(ActuatorAction::Status, None).await
    }

    pub async fn issue(
        &self,
        action: ActuatorAction,
        speed: Option<MotorSpeed>,
    ) -> Result<CommandOutcome> {
        let connected = self.channel.is_connected();
        let checked = self.machine().check(action, connected);
        if let Err(reason) = checked {
            debug!(action = %action, reason = %reason, "Command blocked by guard");
            return Ok(CommandOutcome::Blocked(reason));
        }

        let command = ActuatorCommand::new(action, speed.unwrap_or(self.default_speed));
        if let Err(e) = self.channel.send_command(&command).await {
            warn!(action = %action, error = %e, "Actuator command failed");
            return Err(e);
        }

        let prediction = self.machine().record_sent(action);
        info!(
            action = %action,
            speed = command.speed.as_str(),
            predicted = prediction.is_some(),
            "Actuator command issued"
        );
        Ok(CommandOutcome::Sent {
            command,
            prediction,
        })
    }
}
