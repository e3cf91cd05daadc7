use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::message::Message;

/// 工具名到输入 JSON Schema 的映射，声明给模型
pub type ToolSchemas = BTreeMap<String, Value>;

/// 模型接口：发送完整对话日志，返回一条助手消息
///
/// 失败以 `Err` 返回，不做隐式重试。
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn send(&self, messages: &[Message], tools: Option<&ToolSchemas>) -> Result<Message>;
}

pub type DynModelClient = Arc<dyn ModelClient>;
