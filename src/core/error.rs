//! 编排核心错误类型
//!
//! 身份错误、任务冲突与分析器失败会返回给调用方；过期的进度/完成/消息引用不算错误，直接丢弃。
//! 分析任务在途中被 reset 取代时返回 Superseded，此时不会写入任何洞察或建议。

use thiserror::Error;

/// 编排核心可能返回的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StudioError {
    /// 助手 ID 不在固定集合内
    #[error("Unknown actor: {0}")]
    UnknownActor(String),

    /// 同一助手已有进行中的任务
    #[error("Actor {actor} already has a running task ({task_id})")]
    TaskAlreadyRunning { actor: String, task_id: String },

    /// 分析器失败（同时记录到任务的 error 字段）
    #[error("Analysis provider failed: {0}")]
    Provider(String),

    /// 分析任务已不是该助手的当前任务（被 reset 清除或替换）
    #[error("Task {task_id} of actor {actor} was superseded")]
    Superseded { actor: String, task_id: String },

    #[error("Config error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for StudioError {
    fn from(e: config::ConfigError) -> Self {
        StudioError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;
