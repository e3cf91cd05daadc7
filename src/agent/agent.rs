use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, instrument, warn};

use super::stage::{HandledStage, Stage};
use crate::error::{ProbeFlowError, Result};
use crate::flow::{NodeMeta, NodeState, WorkflowNode};
use crate::llm::DynModelClient;
use crate::state::{OutputCallback, WorkflowContext};

/// 组装 agent 的有序阶段链
pub struct AgentBuilder {
    name: String,
    model: Option<DynModelClient>,
    output: Option<OutputCallback>,
    stages: Vec<Box<dyn Stage>>,
}

impl AgentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: None,
            output: None,
            stages: Vec::new(),
        }
    }

    pub fn model(mut self, model: DynModelClient) -> Self {
        self.model = Some(model);
        self
    }

    pub fn on_output(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.output = Some(Arc::new(callback));
        self
    }

    /// 追加一个阶段，前一个阶段成为它的父节点
    pub fn stage<N>(mut self, node: N, handler: impl Fn(N::Output) + Send + Sync + 'static) -> Self
    where
        N: WorkflowNode + 'static,
    {
        let mut stage = HandledStage::new(node, handler);
        let name = stage.name().to_string();
        if let Some(previous) = self.stages.last_mut() {
            previous.meta_mut().children.push(name);
            stage.meta_mut().parent = Some(previous.name().to_string());
        }
        self.stages.push(Box::new(stage));
        self
    }

    pub fn build(self) -> Agent {
        Agent {
            name: self.name,
            model: self.model,
            output: RwLock::new(self.output),
            stages: self.stages,
            run: Mutex::new(None),
        }
    }
}

struct ActiveRun {
    ctx: WorkflowContext,
    stage: usize,
}

/// 严格按顺序运行一条固定的节点链
///
/// 用户输入转交给当前活动的阶段。工作流上下文只在
/// [`Agent::run_agent_workflow`] 期间存在，每次运行开始时各阶段都会被重置。
pub struct Agent {
    name: String,
    model: Option<DynModelClient>,
    output: RwLock<Option<OutputCallback>>,
    stages: Vec<Box<dyn Stage>>,
    run: Mutex<Option<ActiveRun>>,
}

impl Agent {
    pub fn builder(name: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 设置接收所有面向用户文本的回调，下一次运行时生效
    pub fn on_output(&self, callback: impl Fn(&str) + Send + Sync + 'static) {
        *self.output.write() = Some(Arc::new(callback));
    }

    #[instrument(skip(self), fields(agent = %self.name))]
    pub async fn run_agent_workflow(&self) -> Result<()> {
        let ctx = {
            let mut run = self.run.lock();
            if run.is_some() {
                return Err(ProbeFlowError::AgentBusy(self.name.clone()));
            }
            let mut ctx = WorkflowContext::new();
            if let Some(model) = &self.model {
                ctx = ctx.with_model(model.clone());
            }
            if let Some(output) = self.output.read().clone() {
                ctx = ctx.with_output(output);
            }
            *run = Some(ActiveRun {
                ctx: ctx.clone(),
                stage: 0,
            });
            ctx
        };

        let outcome = self.run_stages(&ctx).await;
        *self.run.lock() = None;
        match &outcome {
            Ok(()) => info!(messages = ctx.log().len(), "agent workflow finished"),
            Err(err) => warn!(error = %err, "agent workflow stopped"),
        }
        outcome
    }

    async fn run_stages(&self, ctx: &WorkflowContext) -> Result<()> {
        for stage in &self.stages {
            stage.reset();
        }
        for (index, stage) in self.stages.iter().enumerate() {
            self.activate(index);
            info!(stage = %stage.name(), index, "stage started");
            stage.run_stage(ctx).await?;
        }
        Ok(())
    }

    fn activate(&self, index: usize) {
        if let Some(run) = self.run.lock().as_mut() {
            run.stage = index;
        }
    }

    /// 将用户文本转交给活动阶段；没有运行时忽略
    pub async fn ingest_user_input(&self, text: &str) {
        let target = self
            .run
            .lock()
            .as_ref()
            .map(|run| (run.stage, run.ctx.clone()));
        match target.and_then(|(index, ctx)| self.stages.get(index).map(|stage| (stage, ctx))) {
            Some((stage, ctx)) => stage.ingest(&ctx, text).await,
            None => warn!(agent = %self.name, "user input arrived with no active run"),
        }
    }

    /// 当前正在运行的阶段名
    pub fn active_stage(&self) -> Option<String> {
        let index = self.run.lock().as_ref()?.stage;
        self.stages.get(index).map(|stage| stage.name().to_string())
    }

    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|stage| stage.name().to_string()).collect()
    }

    pub fn stage_state(&self, name: &str) -> Option<NodeState> {
        self.find(name).map(|stage| stage.state())
    }

    /// 阶段记录的父节点与子节点
    pub fn lineage(&self, name: &str) -> Option<NodeMeta> {
        self.find(name).map(|stage| stage.meta().clone())
    }

    fn find(&self, name: &str) -> Option<&dyn Stage> {
        self.stages
            .iter()
            .find(|stage| stage.name() == name)
            .map(|stage| stage.as_ref())
    }
}
