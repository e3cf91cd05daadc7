use serde::{Deserialize, Serialize};

fn default_max_tokens() -> u32 {
    4096
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

/// HTTP 模型接口配置
///
/// `api_key` 可以写成 `${VAR}`，由 [`crate::config::EnvConfig`] 在使用前解析
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HttpModelConfig {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub system: Option<String>,
}

impl HttpModelConfig {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: String::new(),
            model: model.into(),
            max_tokens: default_max_tokens(),
            api_version: default_api_version(),
            system: None,
        }
    }
}
