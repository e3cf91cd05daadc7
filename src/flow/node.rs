use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProbeFlowError, Result};
use crate::message::Message;
use crate::state::WorkflowContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Idle,
    WaitingOnLlm,
    WaitingOnUser,
    Closed,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NodeState::Idle => "idle",
            NodeState::WaitingOnLlm => "waiting_on_llm",
            NodeState::WaitingOnUser => "waiting_on_user",
            NodeState::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// 节点名与父子关系；父子关系只用于溯源，调度不依赖它
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeMeta {
    pub name: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
}

impl NodeMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// 工作流中的一个状态机节点
///
/// `run` 在节点关闭时才返回，期间可能经历多轮用户与模型的往返；
/// `ingest_user_input` 推动这些往返，不直接返回结果
#[async_trait]
pub trait WorkflowNode: Send + Sync {
    type Output: Send + 'static;

    fn meta(&self) -> &NodeMeta;

    fn meta_mut(&mut self) -> &mut NodeMeta;

    fn name(&self) -> &str {
        &self.meta().name
    }

    fn state(&self) -> NodeState;

    /// 回到 `idle` 并清空上一次运行的累积结果
    fn reset(&self);

    async fn run(&self, ctx: &WorkflowContext) -> Result<Self::Output>;

    async fn ingest_user_input(&self, ctx: &WorkflowContext, text: &str);
}

/// 单次运行保护：`idle` 转为 `waiting_on_llm`，否则拒绝
pub(crate) fn claim_idle(node: &str, state: &mut NodeState) -> Result<()> {
    if *state != NodeState::Idle {
        return Err(ProbeFlowError::NodeNotIdle {
            node: node.to_string(),
            state: state.to_string(),
        });
    }
    transition(node, state, NodeState::WaitingOnLlm);
    Ok(())
}

/// 丢弃模型无权发送的块，回复的其余部分照常处理
pub(crate) fn admit_reply(node: &str, mut reply: Message) -> Message {
    for block in reply.take_foreign_blocks() {
        warn!(node = %node, block = block.tag(), "dropping block the model may not send");
    }
    reply
}

pub(crate) fn transition(node: &str, state: &mut NodeState, to: NodeState) {
    if *state != to {
        debug!(node = %node, from = %state, to = %to, "node state transition");
        *state = to;
    }
}
