//! 日志与指标
//!
//! 同步器本身只通过 `tracing` 宏打日志、通过 `metrics` 宏累加计数器，
//! 不持有任何输出端；宿主应用在启动时调用 [`init_telemetry`] 安装
//! 日志订阅者（指标导出端由宿主自行安装）。
//!
//! 同步器发出的计数器：
//! - `matrix_persist_total` 成功的整集权限写入
//! - `matrix_persist_skipped_total` 净零变更跳过的写入
//! - `matrix_persist_errors_total` 失败的整集权限写入
//! - `order_position_writes_total` 远端确认的位置写入
//! - `order_save_errors_total` 失败的位置写入

use crate::config::SyncConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 按配置安装全局日志订阅者
///
/// 重复调用是安全的：全局订阅者已存在时（如测试进程里多次初始化）
/// 保持原样并返回 `false`，首次安装成功返回 `true`。
pub fn init_telemetry(config: &SyncConfig) -> bool {
    // RUST_LOG 优先于配置里的级别
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let log_layer = match config.logging.format.to_lowercase().as_str() {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .boxed(),
        "pretty" => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer().with_target(false).boxed(),
    };

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(log_layer)
        .try_init()
        .is_err()
    {
        return false;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.logging.level,
        format = %config.logging.format,
        "Telemetry initialized"
    );
    true
}
