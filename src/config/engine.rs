use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::env::{EnvConfig, ACTUATOR_SECRET_ENV};
use crate::error::{ProbeFlowError, Result};
use crate::flow::constants::computer::DEFAULT_ITERATION_CAP;
use crate::llm::HttpModelConfig;
use crate::screenshot::CodecConfig;

/// 各阶段的 prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagePrompts {
    pub objective: String,
    pub product_facts: String,
    pub metrics: String,
    pub exploration: String,
}

impl Default for StagePrompts {
    fn default() -> Self {
        Self {
            objective: "Ask the user what they want to learn about their product and record each objective as a context item.".to_string(),
            product_facts: "Ask the user about the product itself: who uses it, the main flows and anything unusual. Record each fact as a context item.".to_string(),
            metrics: "Propose metrics that would show whether the objectives are met. Refine them with the user and record each agreed metric as an asset.".to_string(),
            exploration: "Walk through the product as a new user would, starting from the current screen. Stop once the main flows have been visited.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputerUseConfig {
    /// 最多允许的模型轮数
    pub iteration_cap: u32,
}

impl Default for ComputerUseConfig {
    fn default() -> Self {
        Self {
            iteration_cap: DEFAULT_ITERATION_CAP,
        }
    }
}

/// actuator 连接配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorConfig {
    /// ws:// 或 wss:// 地址
    pub url: String,
    /// 共享密钥，支持 `${VAR}`；为空时读取 PROBEFLOW_ACTUATOR_SECRET
    #[serde(default)]
    pub secret: String,
}

impl ActuatorConfig {
    pub fn resolved_secret(&self) -> Result<String> {
        EnvConfig::get_api_key(&self.secret, ACTUATOR_SECRET_ENV)
    }
}

/// 引擎配置
///
/// 所有 prompt 与限制都从这里显式传入各节点和 agent，不存在全局状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub agent_name: String,
    /// 开场白，由公告节点直接输出
    pub intro: String,
    pub stages: StagePrompts,
    pub computer_use: ComputerUseConfig,
    pub actuator: Option<ActuatorConfig>,
    pub codec: CodecConfig,
    pub model: Option<HttpModelConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            agent_name: "product_agent".to_string(),
            intro: "Hi! I'll ask a few questions about your product, agree on some metrics with you, and then explore the product myself.".to_string(),
            stages: StagePrompts::default(),
            computer_use: ComputerUseConfig::default(),
            actuator: None,
            codec: CodecConfig::default(),
            model: None,
        }
    }
}

impl EngineConfig {
    /// 从 JSON 文件加载，缺省字段使用默认值
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            ProbeFlowError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| ProbeFlowError::Config(format!("invalid engine config: {e}")))
    }
}
