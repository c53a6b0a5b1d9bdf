use crate::error::Result;
use roomlink_types::MotorSpeed;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 电机指令动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorAction {
    Open,
    Close,
    Stop,
    Status,
}

impl ActuatorAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActuatorAction::Open => "open",
            ActuatorAction::Close => "close",
            ActuatorAction::Stop => "stop",
            ActuatorAction::Status => "status",
        }
    }
}

impl fmt::Display for ActuatorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 下发到控制主题的指令 `{action, speed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorCommand {
    pub action: ActuatorAction,

    #[serde(default)]
    pub speed: MotorSpeed,
}

impl ActuatorCommand {
    pub fn new(action: ActuatorAction, speed: MotorSpeed) -> Self {
        Self { action, speed }
    }

    pub fn to_payload(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let command = ActuatorCommand::new(ActuatorAction::Open, MotorSpeed::Normal);
        let payload = String::from_utf8(command.to_payload().unwrap()).unwrap();
        assert_eq!(payload, r#"{"action":"open","speed":"normal"}"#);
    }

    #[test]
    fn test_speed_defaults_to_fast() {
        let command: ActuatorCommand = serde_json::from_str(r#"{"action":"stop"}"#).unwrap();
        assert_eq!(command.speed, MotorSpeed::Fast);
        assert_eq!(command.action.to_string(), "stop");
    }
}
