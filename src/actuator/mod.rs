pub mod action;
pub mod auth;
pub mod client;
pub mod desktop;
pub mod protocol;
pub mod service;

pub use action::{
    scroll_steps, ActionExecutor, ActionOutcome, ComputerAction, DynActionExecutor, SCROLL_STEP_PX,
};
pub use auth::{validate_secret, Grant, Refusal};
pub use client::RemoteActuator;
pub use desktop::{Desktop, DesktopEvent, HeadlessDesktop};
pub use protocol::{ActionResult, Frame};
pub use service::ActionService;
