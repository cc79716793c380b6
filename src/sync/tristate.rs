//! 三态复选框状态推导
//! 始终从原始集合现算，绝不缓存结果

use std::collections::HashSet;

/// 三态复选框状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriState {
    /// 全选
    Checked,
    /// 全不选
    Unchecked,
    /// 部分选中
    Indeterminate,
}

/// 在给定全集上推导选中状态
///
/// 全集为空时视为全不选。`selected` 中不属于全集的元素不参与计数。
pub fn compute_state<'a>(
    selected: &HashSet<String>,
    universe: impl IntoIterator<Item = &'a str>,
) -> TriState {
    let mut total = 0usize;
    let mut hit = 0usize;
    for slug in universe {
        total += 1;
        if selected.contains(slug) {
            hit += 1;
        }
    }

    if total == 0 || hit == 0 {
        TriState::Unchecked
    } else if hit == total {
        TriState::Checked
    } else {
        TriState::Indeterminate
    }
}
