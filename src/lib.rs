pub mod actuator;
pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod flow;
pub mod llm;
pub mod message;
pub mod persona;
pub mod schema;
pub mod screenshot;
pub mod state;
pub mod utils;

pub use actuator::{
    ActionExecutor, ActionOutcome, ActionService, ComputerAction, Desktop, DynActionExecutor,
    HeadlessDesktop, RemoteActuator,
};
pub use agent::{Agent, AgentBuilder};
pub use cli::{schema_exports, SchemaExportEntry};
pub use config::{EngineConfig, EnvConfig};
pub use error::{ProbeFlowError, Result};
pub use flow::{
    AnnouncementNode, AssetGenerationNode, Assets, ComputerUseNode, ContextGatheringNode,
    Contexts, FlowGraph, FlowGraphNode, GatheringNode, NodeState, WorkflowNode,
};
#[cfg(feature = "http-client")]
pub use llm::HttpModelClient;
pub use llm::{DynModelClient, HttpModelConfig, ModelClient, ScriptedModelClient, ToolSchemas};
pub use message::{ContentBlock, Message, Role, StopCondition};
pub use persona::{product_agent, RecordingSink, ResultSink};
pub use schema::{PayloadSchema, Schema, SchemaError, SchemaKind};
pub use screenshot::{CodecConfig, EncodedScreenshot, ScreenshotCodec};
pub use state::{MessageLog, WorkflowContext};
pub use utils::{logging, validation};
