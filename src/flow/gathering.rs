use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::node::{admit_reply, claim_idle, transition, NodeMeta, NodeState, WorkflowNode};
use super::pending::{settled, PendingCompletion};
use super::prompt::PromptBuilder;
use crate::error::{ProbeFlowError, Result};
use crate::message::{ContentBlock, Message};
use crate::schema::{PayloadSchema, SchemaError};
use crate::state::WorkflowContext;

/// 信息收集节点的累积结果
///
/// 数据块的 JSON 解码为 `Self`；通过校验的数据整体追加，不去重
pub trait Collection:
    Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static
{
    /// 承载条目数组的字段名
    const FIELD: &'static str;
    /// 承载数据的内容块标签
    const BLOCK_TAG: &'static str;

    fn payload(block: &ContentBlock) -> Option<&str>;

    fn len(&self) -> usize;

    fn append(&mut self, other: Self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contexts<T> {
    pub contexts: Vec<T>,
}

impl<T> Default for Contexts<T> {
    fn default() -> Self {
        Self {
            contexts: Vec::new(),
        }
    }
}

impl<T> Collection for Contexts<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    const FIELD: &'static str = "contexts";
    const BLOCK_TAG: &'static str = "workflow_context";

    fn payload(block: &ContentBlock) -> Option<&str> {
        match block {
            ContentBlock::WorkflowContext { content } => Some(content),
            _ => None,
        }
    }

    fn len(&self) -> usize {
        self.contexts.len()
    }

    fn append(&mut self, other: Self) {
        self.contexts.extend(other.contexts);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assets<T> {
    pub assets: Vec<T>,
}

impl<T> Default for Assets<T> {
    fn default() -> Self {
        Self { assets: Vec::new() }
    }
}

impl<T> Collection for Assets<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    const FIELD: &'static str = "assets";
    const BLOCK_TAG: &'static str = "workflow_gen_asset";

    fn payload(block: &ContentBlock) -> Option<&str> {
        match block {
            ContentBlock::WorkflowGenAsset { content } => Some(content),
            _ => None,
        }
    }

    fn len(&self) -> usize {
        self.assets.len()
    }

    fn append(&mut self, other: Self) {
        self.assets.extend(other.assets);
    }
}

/// 数据块的 JSON Schema：条目 schema 包在 [`Collection::FIELD`] 之下
pub fn envelope_schema<C: Collection>(items: Value) -> Value {
    json!({
        "type": "object",
        "properties": { C::FIELD: items },
        "required": [C::FIELD],
    })
}

struct Gathered<C> {
    state: NodeState,
    collected: C,
    pending: PendingCompletion<C>,
}

/// 通过模型与用户对话收集结构化条目，直到模型发出停止信号
pub struct GatheringNode<C: Collection> {
    meta: NodeMeta,
    prompt: String,
    schema: Arc<dyn PayloadSchema>,
    inner: Mutex<Gathered<C>>,
}

pub type ContextGatheringNode<T> = GatheringNode<Contexts<T>>;
pub type AssetGenerationNode<T> = GatheringNode<Assets<T>>;

impl<C: Collection> GatheringNode<C> {
    /// `schema` 校验 [`Collection::FIELD`] 下的条目数组
    pub fn new(
        name: impl Into<String>,
        prompt: impl Into<String>,
        schema: Arc<dyn PayloadSchema>,
    ) -> Self {
        Self {
            meta: NodeMeta::new(name),
            prompt: prompt.into(),
            schema,
            inner: Mutex::new(Gathered {
                state: NodeState::Idle,
                collected: C::default(),
                pending: PendingCompletion::new(),
            }),
        }
    }

    /// 目前已接受的全部条目
    pub fn collected(&self) -> C {
        self.inner.lock().collected.clone()
    }

    fn envelope(&self) -> Value {
        envelope_schema::<C>(self.schema.describe())
    }

    fn decode(&self, payload: &str) -> Result<C> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| SchemaError::Malformed(e.to_string()))?;
        let items = value.get(C::FIELD).ok_or_else(|| {
            SchemaError::at(&[], format!("missing required property `{}`", C::FIELD))
        })?;
        self.schema.validate(items)?;
        serde_json::from_value(value).map_err(|e| SchemaError::Malformed(e.to_string()).into())
    }

    async fn query_model(&self, ctx: &WorkflowContext) {
        let outcome = async {
            let model = ctx.model()?;
            let reply = admit_reply(
                &self.meta.name,
                model.send(&ctx.log().snapshot(), None).await?,
            );
            ctx.log().push(reply.clone())?;
            Ok::<_, ProbeFlowError>(reply)
        }
        .await;

        match outcome {
            Ok(reply) => self.handle_reply(ctx, &reply),
            Err(err) => self.fail(err),
        }
    }

    /// 按顺序逐块处理一条模型回复
    fn handle_reply(&self, ctx: &WorkflowContext, reply: &Message) {
        let name = self.meta.name.as_str();
        let mut outputs = Vec::new();
        let mut finished = None;
        {
            let mut inner = self.inner.lock();
            for block in &reply.contents {
                if inner.state == NodeState::Closed {
                    debug!(node = %name, block = block.tag(), "ignoring block after stop");
                    continue;
                }
                if let Some(condition) = block.stop_condition() {
                    info!(node = %name, reason = %condition.stop_reason, items = inner.collected.len(), "model signalled stop");
                    transition(name, &mut inner.state, NodeState::Closed);
                    finished = Some(inner.collected.clone());
                    continue;
                }
                match block {
                    ContentBlock::OutputToUser { content } => outputs.push(content.clone()),
                    ContentBlock::WorkflowInstruction { .. } => {
                        debug!(node = %name, "non-terminal instruction from model ignored")
                    }
                    other => match C::payload(other) {
                        Some(payload) => match self.decode(payload) {
                            Ok(batch) => {
                                let added = batch.len();
                                inner.collected.append(batch);
                                debug!(node = %name, added, total = inner.collected.len(), "payload accepted");
                            }
                            Err(err) => {
                                warn!(node = %name, error = %err, "dropping payload that failed validation")
                            }
                        },
                        None => warn!(node = %name, block = other.tag(), "unexpected block ignored"),
                    },
                }
            }
            if inner.state == NodeState::WaitingOnLlm {
                if outputs.is_empty() {
                    warn!(node = %name, "reply neither addressed the user nor stopped");
                }
                transition(name, &mut inner.state, NodeState::WaitingOnUser);
            }
        }

        for text in &outputs {
            ctx.emit(text);
        }
        if let Some(collected) = finished {
            self.inner.lock().pending.finalize(collected);
        }
    }

    fn fail(&self, err: ProbeFlowError) {
        error!(node = %self.meta.name, error = %err, "node run failed");
        let mut inner = self.inner.lock();
        transition(&self.meta.name, &mut inner.state, NodeState::Closed);
        inner.pending.abort(err);
    }
}

#[async_trait]
impl<C: Collection> WorkflowNode for GatheringNode<C> {
    type Output = C;

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
        inner.collected = C::default();
        inner.pending = PendingCompletion::new();
    }

    async fn run(&self, ctx: &WorkflowContext) -> Result<C> {
        let rx = {
            let mut inner = self.inner.lock();
            claim_idle(&self.meta.name, &mut inner.state)?;
            inner.pending.arm()
        };

        let instructions = PromptBuilder::gathering(&self.prompt, C::BLOCK_TAG, &self.envelope());
        match ctx.log().push(Message::user(instructions)) {
            Ok(()) => self.query_model(ctx).await,
            Err(err) => self.fail(err),
        }
        settled(rx, &self.meta.name).await
    }

    async fn ingest_user_input(&self, ctx: &WorkflowContext, text: &str) {
        {
            let mut inner = self.inner.lock();
            match inner.state {
                NodeState::WaitingOnUser => {
                    transition(&self.meta.name, &mut inner.state, NodeState::WaitingOnLlm)
                }
                NodeState::Closed => {
                    debug!(node = %self.meta.name, "input after close ignored");
                    return;
                }
                state => {
                    warn!(node = %self.meta.name, state = %state, "input ignored: node is not waiting on the user");
                    return;
                }
            }
        }

        match ctx.log().push(Message::user_text(text)) {
            Ok(()) => self.query_model(ctx).await,
            Err(err) => self.fail(err),
        }
    }
}
