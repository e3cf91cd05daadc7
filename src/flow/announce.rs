use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use super::node::{claim_idle, transition, NodeMeta, NodeState, WorkflowNode};
use crate::error::Result;
use crate::message::{ContentBlock, Message};
use crate::state::WorkflowContext;

/// 输出固定文本后直接关闭，不调用模型
pub struct AnnouncementNode {
    meta: NodeMeta,
    text: String,
    state: Mutex<NodeState>,
}

impl AnnouncementNode {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            meta: NodeMeta::new(name),
            text: text.into(),
            state: Mutex::new(NodeState::Idle),
        }
    }
}

#[async_trait]
impl WorkflowNode for AnnouncementNode {
    type Output = ();

    fn meta(&self) -> &NodeMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut NodeMeta {
        &mut self.meta
    }

    fn state(&self) -> NodeState {
        *self.state.lock()
    }

    fn reset(&self) {
        *self.state.lock() = NodeState::Idle;
    }

    async fn run(&self, ctx: &WorkflowContext) -> Result<()> {
        claim_idle(&self.meta.name, &mut self.state.lock())?;
        let pushed = ctx
            .log()
            .push(Message::assistant(vec![ContentBlock::output(self.text.clone())]));
        transition(&self.meta.name, &mut self.state.lock(), NodeState::Closed);
        pushed?;
        ctx.emit(&self.text);
        Ok(())
    }

    async fn ingest_user_input(&self, _ctx: &WorkflowContext, _text: &str) {
        debug!(node = %self.meta.name, "announcement nodes take no input");
    }
}
