//! 角色×权限矩阵同步器
//! 本地乐观修改 + 按角色去抖的整集持久化

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::try_join_all;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api::{normalize_permission_slugs, AdminApi};
use crate::config::SyncConfig;
use crate::error::ConsoleError;
use crate::models::permission::{Permission, PermissionGroup};
use crate::models::role::RoleLite;
use crate::sync::debounce::KeyedDebouncer;
use crate::sync::tristate::{compute_state, TriState};
use crate::sync::with_timeout;

/// 矩阵内部状态
///
/// `matrix` 是每个角色的完整权限集（整集，而非增量）；
/// `persisted` 是每个角色最近一次远端确认的集合，
/// 去抖到点时与之比对，净零变更直接跳过写入。
#[derive(Debug, Default)]
struct MatrixState {
    groups: Vec<PermissionGroup>,
    roles: Vec<RoleLite>,
    matrix: HashMap<String, HashSet<String>>,
    persisted: HashMap<String, HashSet<String>>,
    pending: HashSet<String>,
    search: String,
    loaded: bool,
}

impl MatrixState {
    /// 当前搜索过滤下可见的权限 slug（全选/列三态的作用域）
    fn visible_slugs(&self) -> Vec<String> {
        let needle = self.search.trim().to_lowercase();
        let mut slugs = Vec::new();
        for group in &self.groups {
            for permission in &group.permissions {
                if needle.is_empty()
                    || permission.name.to_lowercase().contains(&needle)
                    || permission.slug.to_lowercase().contains(&needle)
                {
                    slugs.push(permission.slug.clone());
                }
            }
        }
        slugs
    }
}

/// 单个角色本地与远端赋权集的漂移
#[derive(Debug, Clone)]
pub struct RoleDrift {
    pub role_slug: String,
    /// 远端有而本地没有的权限
    pub missing_locally: Vec<String>,
    /// 本地有而远端没有的权限
    pub missing_remotely: Vec<String>,
}

/// 矩阵同步器
///
/// 对每个被用户触碰过的角色，保证远端最终持有与本地展示一致的
/// 完整权限集。每个角色一条独立的去抖线，角色间互不阻塞。
pub struct MatrixSynchronizer {
    api: Arc<dyn AdminApi>,
    state: Arc<Mutex<MatrixState>>,
    debouncer: KeyedDebouncer,
    timeout: Duration,
}

impl MatrixSynchronizer {
    pub fn new(api: Arc<dyn AdminApi>, config: &SyncConfig) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(MatrixState::default())),
            debouncer: KeyedDebouncer::new(Duration::from_millis(config.matrix.debounce_ms)),
            timeout: Duration::from_secs(config.request.timeout_secs),
        }
    }

    // ==================== 加载 ====================

    /// 加载权限分组、角色列表与每个角色当前的赋权集
    ///
    /// 一次批量拉取加 N 个按角色的并发拉取（扇出后合并），
    /// 任一失败视为整体加载失败并清空本地矩阵。
    pub async fn load(&self) -> Result<(), ConsoleError> {
        let result = self.load_inner().await;

        if let Err(ref err) = result {
            error!(error = %err, "Matrix load failed, clearing local state");
            let mut state = self.state.lock().unwrap();
            let search = std::mem::take(&mut state.search);
            *state = MatrixState {
                search,
                ..MatrixState::default()
            };
        }

        result
    }

    async fn load_inner(&self) -> Result<(), ConsoleError> {
        let (groups, roles) = tokio::try_join!(
            with_timeout(
                self.timeout,
                "fetch_permission_groups",
                self.api.fetch_permission_groups(),
            ),
            with_timeout(self.timeout, "fetch_roles_lite", self.api.fetch_roles_lite()),
        )?;

        // 按角色扇出拉取赋权集，全部到齐才算加载完成
        let timeout = self.timeout;
        let fetches = roles.iter().map(|role| {
            let api = self.api.clone();
            let role_slug = role.slug.clone();
            async move {
                let value = with_timeout(
                    timeout,
                    "fetch_role_permission_slugs",
                    api.fetch_role_permission_slugs(&role_slug),
                )
                .await?;
                let slugs = normalize_permission_slugs(&value)?;
                Ok::<_, ConsoleError>((role_slug, slugs.into_iter().collect::<HashSet<_>>()))
            }
        });
        let assignments: HashMap<String, HashSet<String>> =
            try_join_all(fetches).await?.into_iter().collect();

        let mut state = self.state.lock().unwrap();
        info!(
            groups = groups.len(),
            roles = roles.len(),
            "Permission matrix loaded"
        );
        state.groups = groups;
        state.roles = roles;
        state.persisted = assignments.clone();
        state.matrix = assignments;
        state.pending.clear();
        state.loaded = true;

        Ok(())
    }

    // ==================== 切换操作 ====================

    /// 切换单个单元格
    pub fn toggle_cell(&self, role_slug: &str, permission_slug: &str, checked: bool) {
        {
            let mut state = self.state.lock().unwrap();
            let set = state.matrix.entry(role_slug.to_string()).or_default();
            if checked {
                set.insert(permission_slug.to_string());
            } else {
                set.remove(permission_slug);
            }
            state.pending.insert(role_slug.to_string());
        }
        self.schedule_persist(role_slug);
    }

    /// 为某个角色整组切换（一次逻辑操作，只触发一次保存）
    pub fn toggle_group(
        &self,
        role_slug: &str,
        group_id: Uuid,
        checked: bool,
    ) -> Result<(), ConsoleError> {
        {
            let mut state = self.state.lock().unwrap();
            let group_slugs: Vec<String> = state
                .groups
                .iter()
                .find(|g| g.id == group_id)
                .ok_or_else(|| {
                    ConsoleError::InvalidInput(format!("unknown permission group: {group_id}"))
                })?
                .permissions
                .iter()
                .map(|p| p.slug.clone())
                .collect();

            let set = state.matrix.entry(role_slug.to_string()).or_default();
            for slug in group_slugs {
                if checked {
                    set.insert(slug);
                } else {
                    set.remove(&slug);
                }
            }
            state.pending.insert(role_slug.to_string());
        }
        self.schedule_persist(role_slug);
        Ok(())
    }

    /// 整列切换：勾选时加入全部“当前可见”的权限，取消时移除之
    ///
    /// 作用域受搜索过滤限制，被过滤掉的权限不受影响。
    pub fn toggle_role_column(&self, role_slug: &str, checked: bool) {
        {
            let mut state = self.state.lock().unwrap();
            let visible = state.visible_slugs();
            let set = state.matrix.entry(role_slug.to_string()).or_default();
            for slug in visible {
                if checked {
                    set.insert(slug);
                } else {
                    set.remove(&slug);
                }
            }
            state.pending.insert(role_slug.to_string());
        }
        self.schedule_persist(role_slug);
    }

    // ==================== 派生状态 ====================

    /// 列三态：该角色在当前可见权限上的选中状态
    pub fn column_state(&self, role_slug: &str) -> TriState {
        let state = self.state.lock().unwrap();
        let visible = state.visible_slugs();
        let empty = HashSet::new();
        let selected = state.matrix.get(role_slug).unwrap_or(&empty);
        compute_state(selected, visible.iter().map(String::as_str))
    }

    /// 行三态：某个权限在全部角色上的分配状态
    pub fn row_state(&self, permission_slug: &str) -> TriState {
        let state = self.state.lock().unwrap();
        let holders: HashSet<String> = state
            .roles
            .iter()
            .filter(|role| {
                state
                    .matrix
                    .get(&role.slug)
                    .is_some_and(|set| set.contains(permission_slug))
            })
            .map(|role| role.slug.clone())
            .collect();
        compute_state(&holders, state.roles.iter().map(|r| r.slug.as_str()))
    }

    /// 组三态：该角色在整个分组（不受过滤影响）上的选中状态
    pub fn group_state(&self, role_slug: &str, group_id: Uuid) -> TriState {
        let state = self.state.lock().unwrap();
        let empty = HashSet::new();
        let selected = state.matrix.get(role_slug).unwrap_or(&empty);
        let universe = state
            .groups
            .iter()
            .find(|g| g.id == group_id)
            .map(|g| g.permissions.as_slice())
            .unwrap_or(&[]);
        compute_state(selected, universe.iter().map(|p| p.slug.as_str()))
    }

    // ==================== 查询 ====================

    /// 设置搜索过滤（影响可见权限、整列切换与列三态的作用域）
    pub fn set_search(&self, search: &str) {
        let mut state = self.state.lock().unwrap();
        state.search = search.to_string();
    }

    /// 当前过滤下可见的权限
    pub fn visible_permissions(&self) -> Vec<Permission> {
        let state = self.state.lock().unwrap();
        let visible: HashSet<String> = state.visible_slugs().into_iter().collect();
        state
            .groups
            .iter()
            .flat_map(|g| g.permissions.iter())
            .filter(|p| visible.contains(&p.slug))
            .cloned()
            .collect()
    }

    /// 某角色当前的完整赋权集
    pub fn assigned(&self, role_slug: &str) -> HashSet<String> {
        let state = self.state.lock().unwrap();
        state.matrix.get(role_slug).cloned().unwrap_or_default()
    }

    /// 角色是否有排队或在途的保存
    pub fn is_pending(&self, role_slug: &str) -> bool {
        let state = self.state.lock().unwrap();
        state.pending.contains(role_slug)
    }

    pub fn groups(&self) -> Vec<PermissionGroup> {
        self.state.lock().unwrap().groups.clone()
    }

    pub fn roles(&self) -> Vec<RoleLite> {
        self.state.lock().unwrap().roles.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.lock().unwrap().loaded
    }

    // ==================== 持久化 ====================

    /// （重新）启动该角色的去抖计时
    fn schedule_persist(&self, role_slug: &str) {
        let api = self.api.clone();
        let state = self.state.clone();
        let timeout = self.timeout;
        let slug = role_slug.to_string();
        self.debouncer.schedule(role_slug, async move {
            persist_role(api, state, slug, timeout).await;
        });
    }

    /// 主动的对账巡检：逐角色重拉远端集合并与本地比对
    ///
    /// 只报告并记录漂移，不修改本地状态；是否采信远端由调用方决定。
    pub async fn reconcile(&self) -> Result<Vec<RoleDrift>, ConsoleError> {
        let roles: Vec<RoleLite> = {
            let state = self.state.lock().unwrap();
            state.roles.clone()
        };

        let timeout = self.timeout;
        let fetches = roles.iter().map(|role| {
            let api = self.api.clone();
            let role_slug = role.slug.clone();
            async move {
                let value = with_timeout(
                    timeout,
                    "fetch_role_permission_slugs",
                    api.fetch_role_permission_slugs(&role_slug),
                )
                .await?;
                let slugs = normalize_permission_slugs(&value)?;
                Ok::<_, ConsoleError>((role_slug, slugs.into_iter().collect::<HashSet<String>>()))
            }
        });
        let remote_sets = try_join_all(fetches).await?;

        let state = self.state.lock().unwrap();
        let mut drifts = Vec::new();
        for (role_slug, remote) in remote_sets {
            let empty = HashSet::new();
            let local = state.matrix.get(&role_slug).unwrap_or(&empty);

            let mut missing_locally: Vec<String> = remote.difference(local).cloned().collect();
            let mut missing_remotely: Vec<String> = local.difference(&remote).cloned().collect();
            if missing_locally.is_empty() && missing_remotely.is_empty() {
                continue;
            }
            missing_locally.sort();
            missing_remotely.sort();

            warn!(
                role = %role_slug,
                missing_locally = missing_locally.len(),
                missing_remotely = missing_remotely.len(),
                "Assignment drift between local matrix and remote store"
            );
            drifts.push(RoleDrift {
                role_slug,
                missing_locally,
                missing_remotely,
            });
        }

        info!(
            roles = state.roles.len(),
            drifted = drifts.len(),
            "Matrix reconciliation pass complete"
        );
        Ok(drifts)
    }

    /// 取消全部未到点的保存计时
    ///
    /// 视图卸载时调用，防止卸载后仍有写发出；丢弃同步器时
    /// 内部去抖器的 Drop 也会做同样的清理。
    pub fn shutdown(&self) {
        self.debouncer.cancel_all();
    }
}

/// 去抖到点后的单角色保存
///
/// 在触发时刻读取“最新”的赋权集，而不是切换时捕获的快照。
/// 与 `persisted` 基线相等的净零变更不产生网络写。
async fn persist_role(
    api: Arc<dyn AdminApi>,
    state: Arc<Mutex<MatrixState>>,
    role_slug: String,
    timeout: Duration,
) {
    let (role_id, desired) = {
        let mut guard = state.lock().unwrap();
        let desired = guard.matrix.get(&role_slug).cloned().unwrap_or_default();
        let unchanged = guard
            .persisted
            .get(&role_slug)
            .map_or(desired.is_empty(), |baseline| *baseline == desired);

        if unchanged {
            guard.pending.remove(&role_slug);
            metrics::counter!("matrix_persist_skipped_total").increment(1);
            debug!(role = %role_slug, "Assignment unchanged since last confirm, skipping write");
            return;
        }

        let role_id = guard.roles.iter().find(|r| r.slug == role_slug).map(|r| r.id);
        let Some(role_id) = role_id else {
            guard.pending.remove(&role_slug);
            warn!(role = %role_slug, "Role no longer known, dropping queued persist");
            return;
        };
        (role_id, desired)
    };

    let mut slugs: Vec<String> = desired.iter().cloned().collect();
    slugs.sort();

    let result = with_timeout(
        timeout,
        "replace_role_permissions",
        api.replace_role_permissions(role_id, &slugs),
    )
    .await;

    let mut guard = state.lock().unwrap();
    // 写入期间该角色的集合若又被改动，说明新一轮保存已排队，
    // pending 标记留给那一轮清理
    let superseded = guard
        .matrix
        .get(&role_slug)
        .map_or(!desired.is_empty(), |current| *current != desired);
    if !superseded {
        guard.pending.remove(&role_slug);
    }
    match result {
        Ok(()) => {
            metrics::counter!("matrix_persist_total").increment(1);
            debug!(
                role = %role_slug,
                permissions = slugs.len(),
                "Role assignment set persisted"
            );
            guard.persisted.insert(role_slug, desired);
        }
        Err(err) => {
            // 保留乐观本地集；基线停在上次确认值，下一次保存会重试整份差异
            metrics::counter!("matrix_persist_errors_total").increment(1);
            error!(
                role = %role_slug,
                error = %err,
                "Failed to persist role assignment set, keeping optimistic local state"
            );
        }
    }
}
