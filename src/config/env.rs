use crate::error::{ProbeFlowError, Result};
use std::env;

/// 模型 API Key 的默认环境变量
pub const API_KEY_ENV: &str = "PROBEFLOW_API_KEY";

/// actuator 共享密钥的默认环境变量
pub const ACTUATOR_SECRET_ENV: &str = "PROBEFLOW_ACTUATOR_SECRET";

/// 环境变量配置管理
pub struct EnvConfig;

impl EnvConfig {
    /// 解析配置中的密钥类字段（API Key、actuator 密钥）
    ///
    /// 优先级：
    /// 1. 直接写在配置中的值（如果不以 ${} 包裹）
    /// 2. `${VAR_NAME}` 指定的环境变量
    /// 3. 值为空时读取 `default_env_var`
    pub fn get_api_key(api_key: &str, default_env_var: &str) -> Result<String> {
        match Self::placeholder(api_key) {
            Some(var) => Self::get_env(var),
            None if api_key.is_empty() => Self::get_env(default_env_var),
            None => Ok(api_key.to_string()),
        }
    }

    /// 从环境变量获取值
    pub fn get_env(key: &str) -> Result<String> {
        env::var(key).map_err(|_| {
            ProbeFlowError::Config(format!(
                "环境变量 '{key}' 未设置。请在 .env 文件中设置或通过环境变量传递。"
            ))
        })
    }

    fn placeholder(value: &str) -> Option<&str> {
        value
            .strip_prefix("${")
            .and_then(|rest| rest.strip_suffix('}'))
            .filter(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_api_key_direct() {
        let result = EnvConfig::get_api_key("sk-1234567890abcdef1234567890", "TEST_API_KEY");
        assert_eq!(result.unwrap(), "sk-1234567890abcdef1234567890");
    }

    #[test]
    fn test_get_api_key_env_var() {
        env::set_var("PROBEFLOW_TEST_MODEL_KEY", "test_key_value");
        let result = EnvConfig::get_api_key("${PROBEFLOW_TEST_MODEL_KEY}", "FALLBACK_KEY");
        assert_eq!(result.unwrap(), "test_key_value");
        env::remove_var("PROBEFLOW_TEST_MODEL_KEY");
    }

    #[test]
    fn test_get_api_key_empty_uses_default() {
        env::set_var("PROBEFLOW_TEST_DEFAULT_KEY", "default_value");
        let result = EnvConfig::get_api_key("", "PROBEFLOW_TEST_DEFAULT_KEY");
        assert_eq!(result.unwrap(), "default_value");
        env::remove_var("PROBEFLOW_TEST_DEFAULT_KEY");
    }

    #[test]
    fn test_missing_env_is_config_error() {
        let result = EnvConfig::get_api_key("${PROBEFLOW_TEST_NEVER_SET}", "X");
        assert!(matches!(result, Err(ProbeFlowError::Config(_))));
    }
}
