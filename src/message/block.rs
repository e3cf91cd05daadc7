use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// 消息中的一个内容块
///
/// 块在消息内的顺序有意义：停止条件块通常位于最后。
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    OutputToUser {
        content: String,
    },
    InputFromUser {
        content: String,
    },
    WorkflowInstruction {
        content: String,
    },
    WorkflowContext {
        content: String,
    },
    WorkflowGenAsset {
        content: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolUseResult {
        tool_use_id: String,
        #[serde(default)]
        is_error: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        screengrab: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_reason: Option<String>,
    },
}

impl ContentBlock {
    pub fn output(content: impl Into<String>) -> Self {
        ContentBlock::OutputToUser {
            content: content.into(),
        }
    }

    pub fn user_input(content: impl Into<String>) -> Self {
        ContentBlock::InputFromUser {
            content: content.into(),
        }
    }

    pub fn instruction(content: impl Into<String>) -> Self {
        ContentBlock::WorkflowInstruction {
            content: content.into(),
        }
    }

    /// 将 `payload` 序列化为 `workflow_context` 块
    pub fn context_payload<T: Serialize>(payload: &T) -> Result<Self> {
        Ok(ContentBlock::WorkflowContext {
            content: serde_json::to_string(payload)?,
        })
    }

    /// 将 `payload` 序列化为 `workflow_gen_asset` 块
    pub fn asset_payload<T: Serialize>(payload: &T) -> Result<Self> {
        Ok(ContentBlock::WorkflowGenAsset {
            content: serde_json::to_string(payload)?,
        })
    }

    pub fn stop(reason: impl Into<String>) -> Self {
        ContentBlock::WorkflowInstruction {
            content: StopCondition::stop(reason).encode(),
        }
    }

    pub fn tool_success(tool_use_id: impl Into<String>, screengrab: String) -> Self {
        ContentBlock::ToolUseResult {
            tool_use_id: tool_use_id.into(),
            is_error: false,
            screengrab: Some(screengrab),
            error_reason: None,
        }
    }

    pub fn tool_error(tool_use_id: impl Into<String>, reason: impl Into<String>) -> Self {
        ContentBlock::ToolUseResult {
            tool_use_id: tool_use_id.into(),
            is_error: true,
            screengrab: None,
            error_reason: Some(reason.into()),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ContentBlock::OutputToUser { .. } => "output_to_user",
            ContentBlock::InputFromUser { .. } => "input_from_user",
            ContentBlock::WorkflowInstruction { .. } => "workflow_instruction",
            ContentBlock::WorkflowContext { .. } => "workflow_context",
            ContentBlock::WorkflowGenAsset { .. } => "workflow_gen_asset",
            ContentBlock::ToolUse { .. } => "tool_use",
            ContentBlock::ToolUseResult { .. } => "tool_use_result",
        }
    }

    /// 解析指令块中的停止条件
    ///
    /// 非指令块、不是停止条件的指令以及 `stop == false` 时返回 `None`
    pub fn stop_condition(&self) -> Option<StopCondition> {
        match self {
            ContentBlock::WorkflowInstruction { content } => {
                StopCondition::parse(content).filter(|condition| condition.stop)
            }
            _ => None,
        }
    }

    pub fn authored_by_model_only(&self) -> bool {
        matches!(self, ContentBlock::ToolUse { .. })
    }

    pub fn authored_by_caller_only(&self) -> bool {
        matches!(
            self,
            ContentBlock::ToolUseResult { .. } | ContentBlock::InputFromUser { .. }
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StopCondition {
    pub stop: bool,
    #[serde(default)]
    pub stop_reason: String,
}

impl StopCondition {
    pub fn stop(reason: impl Into<String>) -> Self {
        Self {
            stop: true,
            stop_reason: reason.into(),
        }
    }

    pub fn parse(content: &str) -> Option<Self> {
        serde_json::from_str(content.trim()).ok()
    }

    pub fn encode(&self) -> String {
        serde_json::json!({ "stop": self.stop, "stopReason": self.stop_reason }).to_string()
    }
}
