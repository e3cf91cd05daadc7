pub mod agent;
pub mod stage;

pub use agent::{Agent, AgentBuilder};
pub use stage::{HandledStage, Handler, Stage};
