//! 角色权限控制台同步核心
//! 提供矩阵同步与有序列表同步引擎

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod sync;
pub mod telemetry;
