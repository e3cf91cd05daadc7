use crate::config::EngineConfig;
use crate::error::{ProbeFlowError, Result};
use crate::screenshot::CodecConfig;

/// 配置验证器
pub struct ConfigValidator;

impl ConfigValidator {
    /// 验证整份引擎配置
    pub fn validate_engine(config: &EngineConfig) -> Result<()> {
        Self::validate_name(&config.agent_name)?;
        Self::validate_iteration_cap(config.computer_use.iteration_cap)?;
        Self::validate_codec(&config.codec)?;
        if let Some(actuator) = &config.actuator {
            Self::validate_ws_url(&actuator.url)?;
        }
        if let Some(model) = &config.model {
            Self::validate_url(&model.endpoint)?;
            Self::validate_model_name(&model.model)?;
        }
        Ok(())
    }

    /// 验证 HTTP URL 格式
    pub fn validate_url(url: &str) -> Result<()> {
        Self::validate_scheme(url, &["http://", "https://"])
    }

    /// 验证 WebSocket URL 格式
    pub fn validate_ws_url(url: &str) -> Result<()> {
        Self::validate_scheme(url, &["ws://", "wss://"])
    }

    /// 验证模型名称
    pub fn validate_model_name(model: &str) -> Result<()> {
        if model.trim().is_empty() {
            return Err(invalid("模型名称不能为空"));
        }
        Ok(())
    }

    /// 验证 agent / 节点名称
    pub fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(invalid("名称不能为空"));
        }

        if !name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            return Err(invalid(format!(
                "名称 '{name}' 包含无效字符，应该只包含字母、数字、下划线和短横线"
            )));
        }

        Ok(())
    }

    pub fn validate_iteration_cap(cap: u32) -> Result<()> {
        if cap == 0 {
            return Err(invalid("iteration_cap 必须至少为 1"));
        }
        Ok(())
    }

    /// 验证截图压缩参数
    pub fn validate_codec(codec: &CodecConfig) -> Result<()> {
        for (field, quality) in [
            ("initial_quality", codec.initial_quality),
            ("quality_floor", codec.quality_floor),
            ("reset_quality", codec.reset_quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(invalid(format!("{field} 必须在 1 到 100 之间，当前值: {quality}")));
            }
        }
        if codec.quality_floor > codec.initial_quality || codec.quality_floor > codec.reset_quality {
            return Err(invalid("quality_floor 不能高于 initial_quality 或 reset_quality"));
        }
        if codec.quality_step == 0 {
            return Err(invalid("quality_step 必须大于 0"));
        }
        if !(codec.shrink_factor > 0.0 && codec.shrink_factor < 1.0) {
            return Err(invalid(format!(
                "shrink_factor 必须在 0 和 1 之间，当前值: {}",
                codec.shrink_factor
            )));
        }
        if codec.max_attempts == 0 || codec.max_width == 0 || codec.byte_budget == 0 {
            return Err(invalid("max_attempts、max_width 与 byte_budget 必须大于 0"));
        }
        Ok(())
    }

    fn validate_scheme(url: &str, schemes: &[&str]) -> Result<()> {
        if url.is_empty() {
            return Err(invalid("URL 不能为空"));
        }
        if !schemes.iter().any(|scheme| url.starts_with(scheme)) {
            return Err(invalid(format!("URL 必须以 {} 开头", schemes.join(" 或 "))));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ProbeFlowError {
    ProbeFlowError::Config(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ActuatorConfig;

    #[test]
    fn test_validate_url() {
        assert!(ConfigValidator::validate_url("").is_err());
        assert!(ConfigValidator::validate_url("example.com").is_err());
        assert!(ConfigValidator::validate_url("https://example.com").is_ok());
        assert!(ConfigValidator::validate_ws_url("http://example.com").is_err());
        assert!(ConfigValidator::validate_ws_url("ws://127.0.0.1:9000").is_ok());
    }

    #[test]
    fn test_validate_name() {
        assert!(ConfigValidator::validate_name("").is_err());
        assert!(ConfigValidator::validate_name("product-agent_1").is_ok());
        assert!(ConfigValidator::validate_name("agent@1").is_err());
    }

    #[test]
    fn test_default_engine_config_is_valid() {
        assert!(ConfigValidator::validate_engine(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_zero_cap_and_bad_actuator() {
        let mut config = EngineConfig::default();
        config.computer_use.iteration_cap = 0;
        assert!(ConfigValidator::validate_engine(&config).is_err());

        let mut config = EngineConfig::default();
        config.actuator = Some(ActuatorConfig {
            url: "tcp://host".into(),
            secret: String::new(),
        });
        assert!(ConfigValidator::validate_engine(&config).is_err());
    }

    #[test]
    fn test_codec_bounds() {
        let mut codec = CodecConfig::default();
        codec.quality_floor = 90;
        assert!(ConfigValidator::validate_codec(&codec).is_err());

        let mut codec = CodecConfig::default();
        codec.shrink_factor = 1.0;
        assert!(ConfigValidator::validate_codec(&codec).is_err());
    }
}
