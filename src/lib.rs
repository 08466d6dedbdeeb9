//! Atelier - 创作助手编排核心
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 助手注册表、实例存储、任务生命周期、跨助手聚合、事件与主控循环
//! - **insight**: 分析器抽象、洞察/建议管线、跨助手规则表
//! - **chat**: 聊天消息、占位消息解析、回复生成
//! - **observability**: 日志初始化

pub mod chat;
pub mod config;
pub mod core;
pub mod insight;
pub mod observability;

pub use crate::core::{Studio, StudioError};
