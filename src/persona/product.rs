use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use super::types::{Metric, Objective, ProductFact};
use crate::actuator::DynActionExecutor;
use crate::agent::Agent;
use crate::config::EngineConfig;
use crate::flow::{
    AnnouncementNode, AssetGenerationNode, ComputerUseNode, ContextGatheringNode, FlowGraph,
};
use crate::llm::DynModelClient;

pub const INTRO_STAGE: &str = "intro";
pub const OBJECTIVE_STAGE: &str = "objective";
pub const PRODUCT_FACTS_STAGE: &str = "product_facts";
pub const METRICS_STAGE: &str = "metrics";
pub const EXPLORATION_STAGE: &str = "exploration";

/// 各阶段结束时接收其结果
pub trait ResultSink: Send + Sync {
    fn objectives(&self, _items: Vec<Objective>) {}

    fn product_facts(&self, _items: Vec<ProductFact>) {}

    fn metrics(&self, _items: Vec<Metric>) {}

    fn exploration(&self, _graph: FlowGraph) {}
}

/// 将收到的结果保存在内存中
#[derive(Default)]
pub struct RecordingSink {
    pub objectives: Mutex<Vec<Objective>>,
    pub product_facts: Mutex<Vec<ProductFact>>,
    pub metrics: Mutex<Vec<Metric>>,
    pub exploration: Mutex<Option<FlowGraph>>,
}

impl ResultSink for RecordingSink {
    fn objectives(&self, items: Vec<Objective>) {
        self.objectives.lock().extend(items);
    }

    fn product_facts(&self, items: Vec<ProductFact>) {
        self.product_facts.lock().extend(items);
    }

    fn metrics(&self, items: Vec<Metric>) {
        self.metrics.lock().extend(items);
    }

    fn exploration(&self, graph: FlowGraph) {
        *self.exploration.lock() = Some(graph);
    }
}

/// 构建产品探索 agent：
/// 开场白、目标、产品信息、指标，最后是界面探索
pub fn product_agent(
    config: &EngineConfig,
    model: DynModelClient,
    executor: DynActionExecutor,
    sink: Arc<dyn ResultSink>,
) -> Agent {
    let prompts = &config.stages;

    let objectives = Arc::clone(&sink);
    let facts = Arc::clone(&sink);
    let metrics = Arc::clone(&sink);
    let exploration = sink;

    Agent::builder(config.agent_name.clone())
        .model(model)
        .stage(AnnouncementNode::new(INTRO_STAGE, config.intro.clone()), |_| {})
        .stage(
            ContextGatheringNode::<Objective>::new(
                OBJECTIVE_STAGE,
                prompts.objective.clone(),
                Arc::new(Objective::schema()),
            ),
            move |collected| {
                info!(count = collected.contexts.len(), "objectives gathered");
                objectives.objectives(collected.contexts)
            },
        )
        .stage(
            ContextGatheringNode::<ProductFact>::new(
                PRODUCT_FACTS_STAGE,
                prompts.product_facts.clone(),
                Arc::new(ProductFact::schema()),
            ),
            move |collected| {
                info!(count = collected.contexts.len(), "product facts gathered");
                facts.product_facts(collected.contexts)
            },
        )
        .stage(
            AssetGenerationNode::<Metric>::new(
                METRICS_STAGE,
                prompts.metrics.clone(),
                Arc::new(Metric::schema()),
            ),
            move |generated| {
                info!(count = generated.assets.len(), "metrics agreed");
                metrics.metrics(generated.assets)
            },
        )
        .stage(
            ComputerUseNode::new(
                EXPLORATION_STAGE,
                prompts.exploration.clone(),
                config.computer_use.iteration_cap,
                executor,
            ),
            move |graph| {
                info!(states = graph.len(), "exploration finished");
                exploration.exploration(graph)
            },
        )
        .build()
}
