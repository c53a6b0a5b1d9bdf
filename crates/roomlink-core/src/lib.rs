pub mod bus;
pub mod state;

pub use bus::EventBus;
pub use state::{ConnectionStatus, DashboardEvent, DashboardState, StateHub};
