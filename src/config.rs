//! 配置系统
//! 从环境变量加载所有配置

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct MatrixConfig {
    /// 单角色保存去抖窗口（毫秒）
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListConfig {
    /// 角色列表每页条数
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    /// 单次远程请求超时时间（秒）
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub matrix: MatrixConfig,
    pub list: ListConfig,
    pub request: RequestConfig,
    pub logging: LoggingConfig,
}

impl SyncConfig {
    /// 从环境变量加载配置（前缀为 ROLEBOARD_）
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        // 添加默认配置
        settings = settings
            .set_default("matrix.debounce_ms", 350)?
            .set_default("list.page_size", 10)?
            .set_default("request.timeout_secs", 10)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?;

        settings = settings.add_source(
            Environment::with_prefix("ROLEBOARD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: SyncConfig = settings.build()?.try_deserialize()?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 验证配置合法性
    fn validate(&self) -> Result<(), ConfigError> {
        // 验证去抖窗口：太短起不到合并作用，太长用户可感知
        if self.matrix.debounce_ms < 50 || self.matrix.debounce_ms > 5000 {
            return Err(ConfigError::Message(
                "matrix.debounce_ms must be between 50 and 5000".to_string(),
            ));
        }

        // 验证分页大小
        if self.list.page_size < 1 || self.list.page_size > 100 {
            return Err(ConfigError::Message(
                "list.page_size must be between 1 and 100".to_string(),
            ));
        }

        // 验证请求超时
        if self.request.timeout_secs < 1 || self.request.timeout_secs > 120 {
            return Err(ConfigError::Message(
                "request.timeout_secs must be between 1 and 120".to_string(),
            ));
        }

        // 验证日志级别
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        // 验证日志格式
        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        Ok(())
    }
}
