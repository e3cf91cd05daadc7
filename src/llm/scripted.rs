use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::client::{ModelClient, ToolSchemas};
use crate::error::{ProbeFlowError, Result};
use crate::message::Message;

/// 一次 [`ScriptedModelClient::send`] 调用的记录
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tools: Option<ToolSchemas>,
}

#[derive(Default)]
struct Script {
    replies: VecDeque<std::result::Result<Message, String>>,
    fallback: Option<Message>,
    requests: Vec<RecordedRequest>,
}

/// 按顺序回放预设回复并记录每次请求
///
/// 队列耗尽后返回兜底回复；没有兜底回复时调用失败
#[derive(Clone, Default)]
pub struct ScriptedModelClient {
    script: Arc<Mutex<Script>>,
}

impl ScriptedModelClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: impl IntoIterator<Item = Message>) -> Self {
        let client = Self::new();
        for reply in replies {
            client.push_reply(reply);
        }
        client
    }

    pub fn push_reply(&self, reply: Message) -> &Self {
        self.script.lock().replies.push_back(Ok(reply));
        self
    }

    pub fn push_failure(&self, reason: impl Into<String>) -> &Self {
        self.script.lock().replies.push_back(Err(reason.into()));
        self
    }

    pub fn set_fallback(&self, reply: Message) -> &Self {
        self.script.lock().fallback = Some(reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.script.lock().requests.len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script.lock().requests.clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    async fn send(&self, messages: &[Message], tools: Option<&ToolSchemas>) -> Result<Message> {
        let mut script = self.script.lock();
        script.requests.push(RecordedRequest {
            messages: messages.to_vec(),
            tools: tools.cloned(),
        });
        match script.replies.pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(reason)) => Err(ProbeFlowError::Model(reason)),
            None => script
                .fallback
                .clone()
                .ok_or_else(|| ProbeFlowError::Model("scripted replies exhausted".into())),
        }
    }
}
