//! 状态同步引擎
//! 矩阵同步器与有序列表同步器，以及共用的去抖/三态工具

pub mod debounce;
pub mod matrix;
pub mod order;
pub mod tristate;

pub use debounce::KeyedDebouncer;
pub use matrix::{MatrixSynchronizer, RoleDrift};
pub use order::{ListSyncState, LoadOutcome, RoleOrderSynchronizer};
pub use tristate::{compute_state, TriState};

use crate::error::ConsoleError;
use std::future::Future;
use std::time::Duration;

/// 为远程调用统一加超时
pub(crate) async fn with_timeout<T>(
    duration: Duration,
    operation: &'static str,
    fut: impl Future<Output = Result<T, ConsoleError>>,
) -> Result<T, ConsoleError> {
    tokio::time::timeout(duration, fut)
        .await
        .map_err(|_| ConsoleError::Timeout(operation))?
}
