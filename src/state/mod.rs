// 运行状态模块

mod context;

pub use context::{MessageLog, OutputCallback, WorkflowContext};
