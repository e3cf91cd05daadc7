use async_trait::async_trait;

use crate::error::Result;
use crate::flow::{NodeMeta, NodeState, WorkflowNode};
use crate::state::WorkflowContext;

/// 类型擦除后的阶段
#[async_trait]
pub trait Stage: Send + Sync {
    fn meta(&self) -> &NodeMeta;

    fn meta_mut(&mut self) -> &mut NodeMeta;

    fn name(&self) -> &str {
        &self.meta().name
    }

    fn state(&self) -> NodeState;

    fn reset(&self);

    /// 运行节点直到结束，并把结果交给处理回调
    async fn run_stage(&self, ctx: &WorkflowContext) -> Result<()>;

    async fn ingest(&self, ctx: &WorkflowContext, text: &str);
}

pub type Handler<T> = Box<dyn Fn(T) + Send + Sync>;

/// 节点与接收其结果的回调
pub struct HandledStage<N: WorkflowNode> {
    node: N,
    handler: Handler<N::Output>,
}

impl<N: WorkflowNode> HandledStage<N> {
    pub fn new(node: N, handler: impl Fn(N::Output) + Send + Sync + 'static) -> Self {
        Self {
            node,
            handler: Box::new(handler),
        }
    }
}

#[async_trait]
impl<N> Stage for HandledStage<N>
where
    N: WorkflowNode + 'static,
{
    fn meta(&self) -> &NodeMeta {
        self.node.meta()
    }

    fn meta_mut(&mut self) -> &mut NodeMeta {
        self.node.meta_mut()
    }

    fn state(&self) -> NodeState {
        self.node.state()
    }

    fn reset(&self) {
        self.node.reset()
    }

    async fn run_stage(&self, ctx: &WorkflowContext) -> Result<()> {
        let value = self.node.run(ctx).await?;
        (self.handler)(value);
        Ok(())
    }

    async fn ingest(&self, ctx: &WorkflowContext, text: &str) {
        self.node.ingest_user_input(ctx, text).await
    }
}
