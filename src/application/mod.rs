mod application;
pub mod data;
mod runtime_config;
mod scenario_player;

pub use application::{Application, ApplicationError};
pub use runtime_config::RuntimeConfig;
pub use scenario_player::ScenarioPlayer;
