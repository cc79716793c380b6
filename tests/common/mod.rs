//! 测试公共模块
//! 提供可录制调用的模拟远程 API 与数据构造辅助

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use roleboard::api::AdminApi;
use roleboard::config::{ListConfig, LoggingConfig, MatrixConfig, RequestConfig, SyncConfig};
use roleboard::error::ConsoleError;
use roleboard::models::permission::{Permission, PermissionGroup};
use roleboard::models::role::{Role, RoleLite, RolePage, RolePageQuery};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// 创建测试配置
pub fn create_test_config() -> SyncConfig {
    SyncConfig {
        matrix: MatrixConfig { debounce_ms: 350 },
        list: ListConfig { page_size: 10 },
        request: RequestConfig { timeout_secs: 10 },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// 录制到的远程调用
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    ReplacePermissions { role_id: Uuid, slugs: Vec<String> },
    UpdateSortOrder { role_id: Uuid, position: i32 },
    DeleteRole { role_id: Uuid },
    FetchPage { page: u32, search: Option<String> },
}

/// 模拟远程管理 API
///
/// 录制所有写调用；各失败开关默认关闭。
/// `page_delays` 可为指定页的拉取注入人工延迟，用于竞态测试。
#[derive(Default)]
pub struct MockAdminApi {
    pub groups: Vec<PermissionGroup>,
    pub roles_lite: Vec<RoleLite>,
    /// 角色 slug -> 权限 slug 响应（允许多种响应形状）
    pub role_slug_responses: Mutex<HashMap<String, Value>>,
    /// 全量角色（总序），分页拉取据此切片
    pub all_roles: Mutex<Vec<Role>>,
    pub calls: Mutex<Vec<RecordedCall>>,
    pub fail_groups: AtomicBool,
    pub fail_replace: AtomicBool,
    pub fail_update_sort: AtomicBool,
    pub fail_page_fetch: AtomicBool,
    pub page_delays: Mutex<HashMap<u32, Duration>>,
    /// 下一次整集替换调用的人工延迟（一次性）
    pub replace_delay: Mutex<Option<Duration>>,
}

impl MockAdminApi {
    pub fn new(groups: Vec<PermissionGroup>, roles_lite: Vec<RoleLite>) -> Self {
        Self {
            groups,
            roles_lite,
            ..Self::default()
        }
    }

    /// 设置某个角色的权限 slug 响应
    pub fn set_role_slugs(&self, role_slug: &str, response: Value) {
        self.role_slug_responses
            .lock()
            .unwrap()
            .insert(role_slug.to_string(), response);
    }

    pub fn set_all_roles(&self, roles: Vec<Role>) {
        *self.all_roles.lock().unwrap() = roles;
    }

    pub fn delay_page(&self, page: u32, delay: Duration) {
        self.page_delays.lock().unwrap().insert(page, delay);
    }

    pub fn delay_next_replace(&self, delay: Duration) {
        *self.replace_delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// 录制到的整集替换调用
    pub fn replace_calls(&self) -> Vec<(Uuid, Vec<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::ReplacePermissions { role_id, slugs } => Some((role_id, slugs)),
                _ => None,
            })
            .collect()
    }

    /// 录制到的位置更新调用
    pub fn sort_calls(&self) -> Vec<(Uuid, i32)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::UpdateSortOrder { role_id, position } => Some((role_id, position)),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl AdminApi for MockAdminApi {
    async fn fetch_permission_groups(&self) -> Result<Vec<PermissionGroup>, ConsoleError> {
        if self.fail_groups.load(Ordering::SeqCst) {
            return Err(ConsoleError::remote(
                "fetch_permission_groups",
                "mock failure",
            ));
        }
        Ok(self.groups.clone())
    }

    async fn fetch_roles_lite(&self) -> Result<Vec<RoleLite>, ConsoleError> {
        Ok(self.roles_lite.clone())
    }

    async fn fetch_role_permission_slugs(&self, role_slug: &str) -> Result<Value, ConsoleError> {
        let responses = self.role_slug_responses.lock().unwrap();
        Ok(responses.get(role_slug).cloned().unwrap_or_else(|| json!([])))
    }

    async fn replace_role_permissions(
        &self,
        role_id: Uuid,
        permission_slugs: &[String],
    ) -> Result<(), ConsoleError> {
        let delay = self.replace_delay.lock().unwrap().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.calls.lock().unwrap().push(RecordedCall::ReplacePermissions {
            role_id,
            slugs: permission_slugs.to_vec(),
        });
        if self.fail_replace.load(Ordering::SeqCst) {
            return Err(ConsoleError::remote(
                "replace_role_permissions",
                "mock failure",
            ));
        }
        Ok(())
    }

    async fn fetch_roles_page(&self, query: &RolePageQuery) -> Result<RolePage, ConsoleError> {
        let delay = self.page_delays.lock().unwrap().remove(&query.page);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.calls.lock().unwrap().push(RecordedCall::FetchPage {
            page: query.page,
            search: query.search.clone(),
        });
        if self.fail_page_fetch.load(Ordering::SeqCst) {
            return Err(ConsoleError::remote("fetch_roles_page", "mock failure"));
        }

        let all = self.all_roles.lock().unwrap();
        let filtered: Vec<Role> = all
            .iter()
            .filter(|role| match &query.search {
                Some(needle) => role
                    .name
                    .to_lowercase()
                    .contains(&needle.to_lowercase()),
                None => true,
            })
            .cloned()
            .collect();

        let start = ((query.page.saturating_sub(1)) * query.page_size) as usize;
        let results = filtered
            .iter()
            .skip(start)
            .take(query.page_size as usize)
            .cloned()
            .collect();

        Ok(RolePage {
            results,
            count: filtered.len() as u64,
        })
    }

    async fn update_role_sort_order(
        &self,
        role_id: Uuid,
        position: i32,
    ) -> Result<(), ConsoleError> {
        self.calls
            .lock()
            .unwrap()
            .push(RecordedCall::UpdateSortOrder { role_id, position });
        if self.fail_update_sort.load(Ordering::SeqCst) {
            return Err(ConsoleError::remote(
                "update_role_sort_order",
                "mock failure",
            ));
        }

        let mut all = self.all_roles.lock().unwrap();
        if let Some(role) = all.iter_mut().find(|role| role.id == role_id) {
            role.sort_order = Some(position);
        }
        Ok(())
    }

    async fn delete_role(&self, role_id: Uuid) -> Result<(), ConsoleError> {
        self.calls
            .lock()
            .unwrap()
            .push(RecordedCall::DeleteRole { role_id });
        let mut all = self.all_roles.lock().unwrap();
        all.retain(|role| role.id != role_id);
        Ok(())
    }
}

// ==================== 数据构造 ====================

/// 创建测试权限
pub fn make_permission(slug: &str, name: &str) -> Permission {
    Permission {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        name: name.to_string(),
        description: None,
    }
}

/// 创建测试权限分组
pub fn make_group(name: &str, permissions: Vec<Permission>) -> PermissionGroup {
    PermissionGroup {
        id: Uuid::new_v4(),
        name: name.to_string(),
        permissions,
    }
}

/// 创建测试角色精简视图
pub fn make_role_lite(slug: &str) -> RoleLite {
    RoleLite {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        name: slug.to_string(),
    }
}

/// 创建测试角色
pub fn make_role(name: &str, sort_order: Option<i32>) -> Role {
    Role {
        id: Uuid::new_v4(),
        slug: name.to_lowercase().replace(' ', "-"),
        name: name.to_string(),
        description: None,
        is_active: true,
        sort_order,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// 创建 n 个按名称编号、无远端顺序值的角色
pub fn make_roles(n: usize) -> Vec<Role> {
    (0..n).map(|i| make_role(&format!("role-{i:02}"), None)).collect()
}
