//! 数据模型模块

pub mod permission;
pub mod role;
