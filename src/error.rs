use thiserror::Error;

use crate::schema::SchemaError;

pub type Result<T> = std::result::Result<T, ProbeFlowError>;

#[derive(Debug, Error)]
pub enum ProbeFlowError {
    #[error("no model client bound to the workflow context")]
    ModelUnavailable,
    #[error("node `{node}` not in idle state (currently {state})")]
    NodeNotIdle { node: String, state: String },
    #[error("node `{0}` was dropped before it settled")]
    NodeAborted(String),
    #[error("agent `{0}` is already running")]
    AgentBusy(String),
    #[error("model request failed: {0}")]
    Model(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("actuator channel failure: {0}")]
    Actuator(String),
    #[error("actuator rejected the handshake: {0}")]
    AuthRejected(String),
    #[error("screenshot still {bytes} bytes after {attempts} attempts")]
    ScreenshotTooLarge { attempts: u32, bytes: usize },
    #[error("image error: {0}")]
    Image(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for ProbeFlowError {
    fn from(err: serde_json::Error) -> Self {
        ProbeFlowError::Serialization(err.to_string())
    }
}

impl From<image::ImageError> for ProbeFlowError {
    fn from(err: image::ImageError) -> Self {
        ProbeFlowError::Image(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ProbeFlowError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ProbeFlowError::Actuator(err.to_string())
    }
}
