pub mod actuator;
pub mod image;
pub mod sensor;

pub use actuator::{ActuatorPosition, ActuatorState, ActuatorStatus, MotorSpeed};
pub use image::{FrameEncoding, ImageFrame};
pub use sensor::{ChartPoint, SensorKind, SensorReading, SensorState, UnknownSensorKind};
