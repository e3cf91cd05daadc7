mod block;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{ProbeFlowError, Result};

pub use block::{ContentBlock, StopCondition};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Assistant,
    User,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub contents: Vec<ContentBlock>,
}

impl Message {
    pub fn user(contents: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            contents,
        }
    }

    pub fn assistant(contents: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            contents,
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![ContentBlock::user_input(text)])
    }

    /// 检查作者约束：只有模型可以发出 `tool_use`；
    /// `tool_use_result` 与 `input_from_user` 只能由调用方发送
    pub fn check_authorship(&self) -> Result<()> {
        match self.contents.iter().find(|block| !self.may_carry(block)) {
            Some(block) => Err(ProbeFlowError::Protocol(format!(
                "{:?} message may not carry a `{}` block",
                self.role,
                block.tag()
            ))),
            None => Ok(()),
        }
    }

    /// 移除作者无权发送的块并返回它们，其余块保持原有顺序
    pub fn take_foreign_blocks(&mut self) -> Vec<ContentBlock> {
        let (kept, foreign): (Vec<_>, Vec<_>) = std::mem::take(&mut self.contents)
            .into_iter()
            .partition(|block| self.may_carry(block));
        self.contents = kept;
        foreign
    }

    fn may_carry(&self, block: &ContentBlock) -> bool {
        match self.role {
            Role::User => !block.authored_by_model_only(),
            Role::Assistant => !block.authored_by_caller_only(),
        }
    }

    pub fn stop_condition(&self) -> Option<StopCondition> {
        self.contents.iter().find_map(ContentBlock::stop_condition)
    }
}

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// 进程内唯一的标识，带可读前缀，例如 `act-1718000000-42`
pub fn new_id(prefix: &str) -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let seq = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{secs}-{seq}")
}
