//! Role domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role
///
/// `sort_order` 为空时表示远端尚未持久化顺序，
/// 列表同步器会按当前页位置补齐稠密顺序值。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub sort_order: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 矩阵列使用的角色精简视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleLite {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
}

/// 角色分页查询（page 从 1 开始）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePageQuery {
    pub search: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl RolePageQuery {
    /// 当前页首行在总序中的偏移
    pub fn page_offset(&self) -> i32 {
        (self.page.saturating_sub(1) * self.page_size) as i32
    }
}

/// 角色分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePage {
    pub results: Vec<Role>,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offset() {
        let query = RolePageQuery {
            search: None,
            page: 3,
            page_size: 10,
        };
        assert_eq!(query.page_offset(), 20);

        let first = RolePageQuery {
            search: None,
            page: 1,
            page_size: 10,
        };
        assert_eq!(first.page_offset(), 0);
    }
}
