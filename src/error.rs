//! 统一错误模型
//! 定义同步核心的所有错误类型

use thiserror::Error;

/// 同步核心错误类型
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Remote store error during {operation}: {message}")]
    Remote {
        operation: &'static str,
        message: String,
    },

    #[error("Malformed remote response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out during {0}")]
    Timeout(&'static str),

    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ConsoleError {
    /// 构造远程调用错误
    pub fn remote(operation: &'static str, message: impl Into<String>) -> Self {
        ConsoleError::Remote {
            operation,
            message: message.into(),
        }
    }

    /// 是否为加载类致命错误（需要在页面级展示）
    pub fn is_load_fatal(&self) -> bool {
        matches!(
            self,
            ConsoleError::Remote { .. }
                | ConsoleError::InvalidResponse(_)
                | ConsoleError::Timeout(_)
        )
    }
}

/// 从 String 转换为 ConsoleError::InvalidResponse
impl From<String> for ConsoleError {
    fn from(s: String) -> Self {
        ConsoleError::InvalidResponse(s)
    }
}
