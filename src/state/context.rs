use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{ProbeFlowError, Result};
use crate::llm::DynModelClient;
use crate::message::Message;

/// 面向用户的输出回调
pub type OutputCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// 一次运行共享的对话日志，只追加不删除
#[derive(Clone, Default)]
pub struct MessageLog {
    messages: Arc<RwLock<Vec<Message>>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条消息；违反作者约束的消息会被拒绝且不写入
    pub fn push(&self, message: Message) -> Result<()> {
        message.check_authorship()?;
        self.messages.write().push(message);
        Ok(())
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.read().clone()
    }

    pub fn last(&self) -> Option<Message> {
        self.messages.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }
}

/// 工作流上下文
///
/// 由一个 Agent 在一次运行期间独占，包含对话日志、可选的模型客户端
/// 以及可选的输出回调。克隆共享同一份日志。
#[derive(Clone, Default)]
pub struct WorkflowContext {
    log: MessageLog,
    model: Option<DynModelClient>,
    output: Option<OutputCallback>,
}

impl WorkflowContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: DynModelClient) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_output(mut self, output: OutputCallback) -> Self {
        self.output = Some(output);
        self
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn model(&self) -> Result<DynModelClient> {
        self.model.clone().ok_or(ProbeFlowError::ModelUnavailable)
    }

    /// 将文本交给输出回调；未注册回调时只记录日志
    pub fn emit(&self, text: &str) {
        match &self.output {
            Some(output) => output(text),
            None => tracing::debug!(text = %text, "no output callback registered"),
        }
    }
}
