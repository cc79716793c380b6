//! 远程管理 API 抽象层
//! 同步核心只通过该接口访问远端存储，传输细节由实现方负责

use crate::error::ConsoleError;
use crate::models::permission::PermissionGroup;
use crate::models::role::{Role, RoleLite, RolePage, RolePageQuery};
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

/// 远程管理 API 契约
///
/// `replace_role_permissions` 始终发送角色的完整权限集（整集替换，非增量），
/// 远端与本地以角色为粒度对齐整个集合。
#[async_trait]
pub trait AdminApi: Send + Sync {
    /// 拉取全部权限分组（含组内权限）
    async fn fetch_permission_groups(&self) -> Result<Vec<PermissionGroup>, ConsoleError>;

    /// 拉取全部角色的精简视图（矩阵列）
    async fn fetch_roles_lite(&self) -> Result<Vec<RoleLite>, ConsoleError>;

    /// 拉取单个角色当前的权限 slug 列表
    ///
    /// 不同后端版本的响应形状不一致（裸数组或带包装键的对象），
    /// 调用方需用 [`normalize_permission_slugs`] 归一化。
    async fn fetch_role_permission_slugs(&self, role_slug: &str) -> Result<Value, ConsoleError>;

    /// 整集替换单个角色的权限
    async fn replace_role_permissions(
        &self,
        role_id: Uuid,
        permission_slugs: &[String],
    ) -> Result<(), ConsoleError>;

    /// 分页拉取角色列表
    async fn fetch_roles_page(&self, query: &RolePageQuery) -> Result<RolePage, ConsoleError>;

    /// 更新单个角色的排序位置
    async fn update_role_sort_order(
        &self,
        role_id: Uuid,
        position: i32,
    ) -> Result<(), ConsoleError>;

    /// 删除角色
    async fn delete_role(&self, role_id: Uuid) -> Result<(), ConsoleError>;
}

/// 响应对象中可能承载 slug 数组的包装键，按优先级排列
const SLUG_ARRAY_KEYS: &[&str] = &["permissions", "permission_slugs", "slugs", "results", "data"];

/// 将权限 slug 响应归一化为 `Vec<String>`
///
/// 接受的形状：
/// - 裸字符串数组：`["posts.read", "posts.write"]`
/// - 对象包装：`{"permissions": [...]}` 等（识别键见 `SLUG_ARRAY_KEYS`）
/// - 数组元素可为字符串，或带 `slug` 字段的对象
pub fn normalize_permission_slugs(value: &Value) -> Result<Vec<String>, ConsoleError> {
    let array = match value {
        Value::Array(items) => items,
        Value::Object(map) => {
            let mut found = None;
            for key in SLUG_ARRAY_KEYS {
                if let Some(Value::Array(items)) = map.get(*key) {
                    found = Some(items);
                    break;
                }
            }
            found.ok_or_else(|| {
                ConsoleError::InvalidResponse(format!(
                    "permission slug response object has none of the recognized keys: {}",
                    SLUG_ARRAY_KEYS.join(", ")
                ))
            })?
        }
        other => {
            return Err(ConsoleError::InvalidResponse(format!(
                "permission slug response must be an array or object, got: {other}"
            )))
        }
    };

    let mut slugs = Vec::with_capacity(array.len());
    for item in array {
        match item {
            Value::String(slug) => slugs.push(slug.clone()),
            Value::Object(map) => match map.get("slug") {
                Some(Value::String(slug)) => slugs.push(slug.clone()),
                _ => {
                    return Err(ConsoleError::InvalidResponse(
                        "permission entry object is missing a string `slug` field".to_string(),
                    ))
                }
            },
            other => {
                return Err(ConsoleError::InvalidResponse(format!(
                    "permission entry must be a string or object, got: {other}"
                )))
            }
        }
    }

    Ok(slugs)
}
