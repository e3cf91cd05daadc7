mod client;
mod config;
#[cfg(feature = "http-client")]
mod http;
mod scripted;

pub use client::{DynModelClient, ModelClient, ToolSchemas};
pub use config::HttpModelConfig;
#[cfg(feature = "http-client")]
pub use http::HttpModelClient;
pub use scripted::{RecordedRequest, ScriptedModelClient};
