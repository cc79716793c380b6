//! 角色有序列表同步器
//! 拖拽重排的乐观更新 + 基于快照差分的最小写集持久化

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::api::AdminApi;
use crate::config::SyncConfig;
use crate::error::ConsoleError;
use crate::models::role::{Role, RolePageQuery};
use crate::sync::with_timeout;

/// 列表与快照的派生同步状态（现算，不存储）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSyncState {
    /// 本地顺序与最近确认的快照一致
    Clean,
    /// 本地顺序有未确认的变更
    Dirty,
}

/// 一次加载的结果
///
/// 被更新请求赶超的过期响应静默丢弃，不算错误。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    Superseded,
}

/// 列表内部状态
///
/// `last_confirmed` 是每个角色最近一次远端确认的位置快照，
/// 每次成功加载或全部写入成功后推进；差分始终对快照计算。
#[derive(Debug, Default)]
struct OrderState {
    roles: Vec<Role>,
    count: u64,
    page: u32,
    search: Option<String>,
    last_confirmed: HashMap<Uuid, i32>,
    saving: bool,
    generation: u64,
}

/// 有序列表同步器
pub struct RoleOrderSynchronizer {
    api: Arc<dyn AdminApi>,
    state: Arc<Mutex<OrderState>>,
    page_size: u32,
    timeout: Duration,
}

impl RoleOrderSynchronizer {
    pub fn new(api: Arc<dyn AdminApi>, config: &SyncConfig) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(OrderState::default())),
            page_size: config.list.page_size,
            timeout: Duration::from_secs(config.request.timeout_secs),
        }
    }

    fn page_offset(&self, page: u32) -> i32 {
        (page.saturating_sub(1) * self.page_size) as i32
    }

    // ==================== 加载 ====================

    /// 加载某一页角色（page 从 1 开始）
    ///
    /// 成功时为缺少 `sort_order` 的条目按页内位置补齐稠密顺序值，
    /// 并把位置快照重置为本次加载的顺序（每次加载建立新基线）。
    /// 失败时保留上一页数据，错误上浮；过期响应静默丢弃。
    pub async fn load_page(
        &self,
        page: u32,
        search: Option<&str>,
    ) -> Result<LoadOutcome, ConsoleError> {
        let generation = {
            let mut state = self.state.lock().unwrap();
            state.generation += 1;
            state.generation
        };

        let query = RolePageQuery {
            search: search.map(str::to_string),
            page,
            page_size: self.page_size,
        };
        let fetched = with_timeout(
            self.timeout,
            "fetch_roles_page",
            self.api.fetch_roles_page(&query),
        )
        .await;

        let mut state = self.state.lock().unwrap();
        if state.generation != generation {
            // 期间又发起了新的加载，本响应已过期
            debug!(page, "Stale roles page response discarded");
            return Ok(LoadOutcome::Superseded);
        }

        let page_data = fetched?;

        let offset = query.page_offset();
        let mut roles = page_data.results;
        for (index, role) in roles.iter_mut().enumerate() {
            if role.sort_order.is_none() {
                role.sort_order = Some(offset + index as i32);
            }
        }

        state.last_confirmed = roles
            .iter()
            .filter_map(|role| role.sort_order.map(|position| (role.id, position)))
            .collect();
        info!(
            page,
            returned = roles.len(),
            total = page_data.count,
            "Roles page loaded"
        );
        state.roles = roles;
        state.count = page_data.count;
        state.page = page;
        state.search = query.search;
        state.saving = false;

        Ok(LoadOutcome::Applied)
    }

    // ==================== 重排与保存 ====================

    /// 拖拽重排：本地同步移动并立即触发保存（单次手势，无需去抖）
    pub async fn reorder(&self, old_index: usize, new_index: usize) -> Result<(), ConsoleError> {
        {
            let mut state = self.state.lock().unwrap();
            let len = state.roles.len();
            if old_index >= len || new_index >= len {
                return Err(ConsoleError::InvalidInput(format!(
                    "reorder indices out of range: {old_index} -> {new_index} (page has {len} rows)"
                )));
            }
            if old_index == new_index {
                return Ok(());
            }

            let role = state.roles.remove(old_index);
            state.roles.insert(new_index, role);

            // 期望位置 = 页偏移 + 页内新下标
            let offset = self.page_offset(state.page);
            for (index, role) in state.roles.iter_mut().enumerate() {
                role.sort_order = Some(offset + index as i32);
            }
        }

        self.save_pass().await;
        Ok(())
    }

    /// 保存轮：对快照差分，只为位置确实变化的角色发写，全部并发
    ///
    /// 全部成功才把快照推进到新顺序；任何失败都不回滚视觉顺序，
    /// 未确认的条目留在快照差分里，由下一次保存轮顺带重试。
    /// 返回本轮发出的写入数。
    pub async fn save_pass(&self) -> usize {
        let (changed, generation) = {
            let mut state = self.state.lock().unwrap();
            let changed: Vec<(Uuid, i32)> = state
                .roles
                .iter()
                .filter_map(|role| {
                    let desired = role.sort_order?;
                    match state.last_confirmed.get(&role.id) {
                        Some(&confirmed) if confirmed == desired => None,
                        _ => Some((role.id, desired)),
                    }
                })
                .collect();

            if changed.is_empty() {
                return 0;
            }
            state.saving = true;
            (changed, state.generation)
        };

        let timeout = self.timeout;
        let writes = changed.iter().map(|&(role_id, position)| {
            let api = self.api.clone();
            async move {
                let result = with_timeout(
                    timeout,
                    "update_role_sort_order",
                    api.update_role_sort_order(role_id, position),
                )
                .await;
                (role_id, position, result)
            }
        });
        let results = join_all(writes).await;

        let mut state = self.state.lock().unwrap();
        state.saving = false;
        if state.generation != generation {
            // 保存期间列表被重新加载，快照已被新基线取代
            debug!("List reloaded during save pass, skipping snapshot advancement");
            return changed.len();
        }

        let mut failures = 0usize;
        for (role_id, position, result) in results {
            match result {
                Ok(()) => {
                    // 逐条确认：快照只记录远端真正确认过的位置
                    state.last_confirmed.insert(role_id, position);
                    metrics::counter!("order_position_writes_total").increment(1);
                }
                Err(err) => {
                    failures += 1;
                    metrics::counter!("order_save_errors_total").increment(1);
                    error!(
                        role_id = %role_id,
                        position,
                        error = %err,
                        "Failed to persist role position, snapshot not advanced for this role"
                    );
                }
            }
        }

        debug!(
            writes = changed.len(),
            failures, "Order save pass complete"
        );
        changed.len()
    }

    // ==================== 删除 ====================

    /// 删除角色并重新加载
    ///
    /// 若删除的是非首页上的最后一行则回退一页，否则重载当前页。
    pub async fn delete(&self, role_id: Uuid) -> Result<LoadOutcome, ConsoleError> {
        if let Err(err) = with_timeout(self.timeout, "delete_role", self.api.delete_role(role_id))
            .await
        {
            error!(role_id = %role_id, error = %err, "Failed to delete role");
            return Err(err);
        }

        let (target_page, search) = {
            let state = self.state.lock().unwrap();
            let last_row_on_later_page = state.roles.len() == 1 && state.page > 1;
            let target = if last_row_on_later_page {
                state.page - 1
            } else {
                state.page
            };
            (target, state.search.clone())
        };

        self.load_page(target_page, search.as_deref()).await
    }

    // ==================== 查询 ====================

    /// 当前页的角色（按展示顺序）
    pub fn roles(&self) -> Vec<Role> {
        self.state.lock().unwrap().roles.clone()
    }

    /// 满足当前搜索条件的角色总数
    pub fn total_count(&self) -> u64 {
        self.state.lock().unwrap().count
    }

    pub fn page(&self) -> u32 {
        self.state.lock().unwrap().page
    }

    pub fn search(&self) -> Option<String> {
        self.state.lock().unwrap().search.clone()
    }

    pub fn is_saving(&self) -> bool {
        self.state.lock().unwrap().saving
    }

    /// 最近确认的位置快照（角色 id -> 位置）
    pub fn confirmed_positions(&self) -> HashMap<Uuid, i32> {
        self.state.lock().unwrap().last_confirmed.clone()
    }

    /// 派生同步状态：本地顺序与快照一致为 Clean，否则 Dirty
    pub fn sync_state(&self) -> ListSyncState {
        let state = self.state.lock().unwrap();
        let clean = state.roles.iter().all(|role| {
            role.sort_order
                .is_some_and(|desired| state.last_confirmed.get(&role.id) == Some(&desired))
        });
        if clean {
            ListSyncState::Clean
        } else {
            ListSyncState::Dirty
        }
    }
}
