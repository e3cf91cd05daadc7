use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::client::{ModelClient, ToolSchemas};
use super::config::HttpModelConfig;
use crate::config::{EnvConfig, API_KEY_ENV};
use crate::error::{ProbeFlowError, Result};
use crate::message::{ContentBlock, Message, Role};

/// 基于 HTTP 的消息式模型客户端
///
/// 引擎自定义的内容块以 JSON 文本形式发送；工具调用与工具结果映射为
/// 原生的 tool_use / tool_result 片段，截图作为 base64 图像发送。
#[derive(Clone)]
pub struct HttpModelClient {
    client: reqwest::Client,
    config: HttpModelConfig,
}

impl HttpModelClient {
    /// `api_key` 为空或为 `${VAR}` 时从环境变量读取
    pub fn new(mut config: HttpModelConfig) -> Result<Self> {
        config.api_key = EnvConfig::get_api_key(&config.api_key, API_KEY_ENV)?;
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| ProbeFlowError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn render_block(block: &ContentBlock) -> Result<Value> {
        Ok(match block {
            ContentBlock::ToolUse { id, name, input } => json!({
                "type": "tool_use",
                "id": id,
                "name": name,
                "input": input,
            }),
            ContentBlock::ToolUseResult {
                tool_use_id,
                is_error,
                screengrab,
                error_reason,
            } => {
                let content = match (screengrab, error_reason) {
                    (Some(data), _) => json!([{
                        "type": "image",
                        "source": { "type": "base64", "media_type": "image/jpeg", "data": data },
                    }]),
                    (None, reason) => json!([{
                        "type": "text",
                        "text": reason.as_deref().unwrap_or("action failed"),
                    }]),
                };
                json!({
                    "type": "tool_result",
                    "tool_use_id": tool_use_id,
                    "is_error": is_error,
                    "content": content,
                })
            }
            other => json!({ "type": "text", "text": serde_json::to_string(other)? }),
        })
    }

    fn render_messages(messages: &[Message]) -> Result<Vec<Value>> {
        messages
            .iter()
            .map(|message| {
                let role = match message.role {
                    Role::Assistant => "assistant",
                    Role::User => "user",
                };
                let content = message
                    .contents
                    .iter()
                    .map(Self::render_block)
                    .collect::<Result<Vec<_>>>()?;
                Ok(json!({ "role": role, "content": content }))
            })
            .collect()
    }

    /// 模型文本应为 JSON 编码的内容块；否则原样作为面向用户的输出
    fn parse_text(text: &str) -> Vec<ContentBlock> {
        let trimmed = text.trim();
        if let Ok(blocks) = serde_json::from_str::<Vec<ContentBlock>>(trimmed) {
            return blocks;
        }
        if let Ok(block) = serde_json::from_str::<ContentBlock>(trimmed) {
            return vec![block];
        }
        vec![ContentBlock::output(text)]
    }

    fn parse_reply(payload: &Value) -> Result<Message> {
        let parts = payload["content"]
            .as_array()
            .ok_or_else(|| ProbeFlowError::Model("reply has no content array".into()))?;
        let mut contents = Vec::new();
        for part in parts {
            match part["type"].as_str() {
                Some("text") => {
                    contents.extend(Self::parse_text(part["text"].as_str().unwrap_or_default()))
                }
                Some("tool_use") => contents.push(ContentBlock::ToolUse {
                    id: part["id"].as_str().unwrap_or_default().to_string(),
                    name: part["name"].as_str().unwrap_or_default().to_string(),
                    input: part["input"].clone(),
                }),
                other => debug!(part_type = ?other, "skipping unsupported reply part"),
            }
        }
        Ok(Message::assistant(contents))
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    #[instrument(skip_all, fields(model = %self.config.model, messages = messages.len()))]
    async fn send(&self, messages: &[Message], tools: Option<&ToolSchemas>) -> Result<Message> {
        let mut body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": Self::render_messages(messages)?,
        });
        if let Some(system) = &self.config.system {
            body["system"] = json!(system);
        }
        if let Some(tools) = tools {
            let declared: Vec<Value> = tools
                .iter()
                .map(|(name, schema)| json!({ "name": name, "input_schema": schema }))
                .collect();
            body["tools"] = json!(declared);
        }

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProbeFlowError::Model(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ProbeFlowError::Model(format!(
                "request failed with status {status}: {detail}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProbeFlowError::Model(e.to_string()))?;
        Self::parse_reply(&payload)
    }
}
