use std::env;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 打开详细日志的环境变量
pub const DEBUG_ENV: &str = "PROBEFLOW_DEBUG";

/// 日志配置
pub struct LoggingConfig;

impl LoggingConfig {
    /// 初始化日志系统
    ///
    /// 支持通过环境变量配置：
    /// - RUST_LOG: 设置日志级别（error, warn, info, debug, trace）
    /// - PROBEFLOW_DEBUG: 启用详细调试输出（target、文件、行号、线程 id）
    ///
    /// 重复调用是安全的，只有第一次生效
    ///
    /// ```no_run
    /// use probeflow::utils::LoggingConfig;
    ///
    /// LoggingConfig::init();
    /// tracing::info!("ready");
    /// ```
    pub fn init() {
        let is_debug = Self::is_debug();

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(Self::default_directives(is_debug)));

        let fmt_layer = fmt::layer()
            .with_target(is_debug)
            .with_file(is_debug)
            .with_line_number(is_debug)
            .with_thread_ids(is_debug);

        let installed = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .is_ok();

        if installed && is_debug {
            tracing::debug!("调试模式已启用");
        }
    }

    /// 检查是否启用调试模式
    pub fn is_debug() -> bool {
        env::var(DEBUG_ENV).is_ok()
    }

    /// 未设置 RUST_LOG 时使用的过滤规则
    pub fn default_directives(is_debug: bool) -> &'static str {
        if is_debug {
            "probeflow=debug,info"
        } else {
            "probeflow=info,warn"
        }
    }
}
