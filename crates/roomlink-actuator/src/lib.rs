pub mod channel;
pub mod command;
pub mod controller;
pub mod error;
pub mod machine;

pub use channel::CommandChannel;
pub use command::{ActuatorAction, ActuatorCommand};
pub use controller::{ActuatorController, CommandOutcome};
pub use error::{CommandError, Result};
pub use machine::{ActuatorMachine, BlockReason, CommandGuards, Prediction};

#[cfg(feature = "mqtt")]
pub use channel::MqttCommandChannel;
