use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::constants::computer as computer_consts;
use super::graph::FlowGraph;
use super::node::{admit_reply, claim_idle, transition, NodeMeta, NodeState, WorkflowNode};
use super::prompt::PromptBuilder;
use crate::actuator::{ActionOutcome, ComputerAction, DynActionExecutor};
use crate::error::Result;
use crate::llm::ToolSchemas;
use crate::message::{ContentBlock, Message};
use crate::state::WorkflowContext;

struct Exploration {
    state: NodeState,
    graph: FlowGraph,
}

/// 由模型自主操作远程桌面的节点
///
/// 每一轮模型可以请求 `computer` 动作，结果写回日志供模型继续判断。
/// 模型发出停止信号或达到 `iteration_cap` 轮后结束。
pub struct ComputerUseNode {
    meta: NodeMeta,
    prompt: String,
    iteration_cap: u32,
    executor: DynActionExecutor,
    inner: Mutex<Exploration>,
}

impl ComputerUseNode {
    pub fn new(
        name: impl Into<String>,
        prompt: impl Into<String>,
        iteration_cap: u32,
        executor: DynActionExecutor,
    ) -> Self {
        Self {
            meta: NodeMeta::new(name),
            prompt: prompt.into(),
            iteration_cap,
            executor,
            inner: Mutex::new(Exploration {
                state: NodeState::Idle,
                graph: FlowGraph::new(),
            }),
        }
    }

    pub fn tool_schemas() -> ToolSchemas {
        let mut tools = ToolSchemas::new();
        tools.insert(
            computer_consts::TOOL_NAME.to_string(),
            ComputerAction::tool_schema(),
        );
        tools
    }

    pub fn graph(&self) -> FlowGraph {
        self.inner.lock().graph.clone()
    }

    fn close(&self) {
        let mut inner = self.inner.lock();
        transition(&self.meta.name, &mut inner.state, NodeState::Closed);
    }

    async fn explore(&self, ctx: &WorkflowContext) -> Result<FlowGraph> {
        let model = ctx.model()?;
        ctx.log().push(Message::user(PromptBuilder::computer_use(
            &self.prompt,
            computer_consts::TOOL_NAME,
        )))?;
        let tools = Self::tool_schemas();

        for turn in 1..=self.iteration_cap {
            let reply = admit_reply(
                &self.meta.name,
                model.send(&ctx.log().snapshot(), Some(&tools)).await?,
            );
            ctx.log().push(reply.clone())?;

            let mut results = Vec::new();
            let mut stopped = None;
            for block in &reply.contents {
                if let Some(condition) = block.stop_condition() {
                    stopped = Some(condition);
                    break;
                }
                match block {
                    ContentBlock::ToolUse { id, name, input } if name == computer_consts::TOOL_NAME => {
                        results.push(self.execute(id, input).await?);
                    }
                    ContentBlock::ToolUse { id, name, .. } => {
                        warn!(node = %self.meta.name, tool = %name, "unknown tool requested");
                        results.push(ContentBlock::tool_error(
                            id.clone(),
                            format!("unknown tool `{name}`"),
                        ));
                    }
                    other => {
                        warn!(node = %self.meta.name, block = other.tag(), "unexpected block ignored")
                    }
                }
            }

            if !results.is_empty() {
                ctx.log().push(Message::user(results))?;
            }
            if let Some(condition) = stopped {
                info!(node = %self.meta.name, turn, reason = %condition.stop_reason, "exploration finished");
                self.close();
                return Ok(self.graph());
            }
            debug!(node = %self.meta.name, turn, states = self.inner.lock().graph.len(), "turn complete");
        }

        info!(node = %self.meta.name, cap = self.iteration_cap, "iteration cap reached without stop");
        Ok(self.graph())
    }

    async fn execute(&self, tool_use_id: &str, input: &Value) -> Result<ContentBlock> {
        let action: ComputerAction = match serde_json::from_value(input.clone()) {
            Ok(action) => action,
            Err(err) => {
                warn!(node = %self.meta.name, error = %err, "model sent an invalid action");
                return Ok(ContentBlock::tool_error(
                    tool_use_id,
                    format!("invalid action: {err}"),
                ));
            }
        };

        debug!(node = %self.meta.name, action = %action.describe(), "performing action");
        match self.executor.perform(&action).await? {
            ActionOutcome::Success { screengrab } => {
                self.inner.lock().graph.record(&action, screengrab.clone());
                Ok(ContentBlock::tool_success(tool_use_id, screengrab))
            }
            ActionOutcome::Error { reason } => {
                warn!(node = %self.meta.name, action = %action.describe(), reason = %reason, "action failed");
                Ok(ContentBlock::tool_error(tool_use_id, reason))
            }
        }
    }
}

#[async_trait]
impl WorkflowNode for ComputerUseNode {
    type Output = FlowGraph;

    fn meta(&self) -> &NodeMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut NodeMeta {
        &mut self.meta
    }

    fn state(&self) -> NodeState {
        self.inner.lock().state
    }

    fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.state = NodeState::Idle;
        inner.graph = FlowGraph::new();
    }

    /// 达到轮数上限时返回已构建的图，节点保持 `waiting_on_llm`
    async fn run(&self, ctx: &WorkflowContext) -> Result<FlowGraph> {
        claim_idle(&self.meta.name, &mut self.inner.lock().state)?;
        let outcome = self.explore(ctx).await;
        if let Err(err) = &outcome {
            error!(node = %self.meta.name, error = %err, "exploration failed");
            self.close();
        }
        outcome
    }

    async fn ingest_user_input(&self, _ctx: &WorkflowContext, _text: &str) {
        debug!(node = %self.meta.name, "computer-use nodes run without user input");
    }
}
