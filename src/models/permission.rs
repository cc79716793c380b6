//! Permission domain models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Permission
///
/// 所有赋权操作以 `slug` 为键，而不是数值 id，
/// 保证跨会话重新拉取后引用仍然稳定。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
}

/// Permission group（组内顺序即表格行分组顺序）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionGroup {
    pub id: Uuid,
    pub name: String,
    pub permissions: Vec<Permission>,
}
