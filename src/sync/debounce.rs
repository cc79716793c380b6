//! 按键去抖定时器表
//! 每个键一条独立的定时线；重复调度会重置该键的计时

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::AbortHandle;

/// 按键去抖器
///
/// `schedule` 会取消同键上尚未到点的定时任务并重新计时，
/// 不同键的定时互不影响。丢弃去抖器时取消所有未到点的定时任务。
///
/// 定时器到点后动作会被转入独立任务执行：已经开始的动作
/// （例如已发出的网络写）不会再被后续的重排或取消打断。
pub struct KeyedDebouncer {
    delay: Duration,
    timers: Mutex<HashMap<String, AbortHandle>>,
}

impl KeyedDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// 去抖窗口长度
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// 调度（或重置）某个键上的延迟动作
    pub fn schedule<F>(&self, key: &str, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // 到点即转为独立任务，动作本身不再受定时器表的取消影响
            tokio::spawn(action);
        });

        let mut timers = self.timers.lock().unwrap();
        if let Some(previous) = timers.insert(key.to_string(), handle.abort_handle()) {
            previous.abort();
        }
    }

    /// 取消某个键上未到点的定时任务
    pub fn cancel(&self, key: &str) {
        let mut timers = self.timers.lock().unwrap();
        if let Some(handle) = timers.remove(key) {
            handle.abort();
        }
    }

    /// 取消全部未到点的定时任务
    pub fn cancel_all(&self) {
        let mut timers = self.timers.lock().unwrap();
        for (_, handle) in timers.drain() {
            handle.abort();
        }
    }
}

impl Drop for KeyedDebouncer {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
