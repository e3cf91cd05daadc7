pub mod engine;
pub mod env;

pub use engine::{ActuatorConfig, ComputerUseConfig, EngineConfig, StagePrompts};
pub use env::{EnvConfig, ACTUATOR_SECRET_ENV, API_KEY_ENV};
