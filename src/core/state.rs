//! 状态定义：助手状态、全局模式与 FeedState 投影
//!
//! 状态只是展示提示，不做严格的迁移表校验；FeedState 是给展示层的轻量投影。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::store::ActorInstance;
use crate::insight::{Insight, Suggestion};

/// 助手状态
///
/// `Idle` 是初始态，也是任务完成后的静止态；其余状态通常由任务管理器或聊天管线进入：
/// - `Analyzing` / `Working`：分析或生成任务进行中
/// - `Thinking`：聊天回复生成中
/// - `Observing` / `Suggesting` / `Waiting`：展示提示，调用方按需设置
/// - `Error`：任务失败，开始新任务即可恢复
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorStatus {
    #[default]
    Idle,
    Observing,
    Analyzing,
    Thinking,
    Suggesting,
    Working,
    Waiting,
    Error,
}

/// 全局模式（外部配置值），由洞察管线查询以决定是否产出
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantMode {
    Passive,
    #[default]
    Proactive,
    Focused,
    Collaborative,
    Disabled,
}

impl AssistantMode {
    pub fn emits_insights(&self) -> bool {
        !matches!(self, AssistantMode::Disabled)
    }

    /// Passive 只记录洞察，不触发跨助手建议
    pub fn emits_suggestions(&self) -> bool {
        !matches!(self, AssistantMode::Disabled | AssistantMode::Passive)
    }
}

impl fmt::Display for AssistantMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssistantMode::Passive => "passive",
            AssistantMode::Proactive => "proactive",
            AssistantMode::Focused => "focused",
            AssistantMode::Collaborative => "collaborative",
            AssistantMode::Disabled => "disabled",
        };
        f.write_str(s)
    }
}

impl FromStr for AssistantMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "passive" => Ok(AssistantMode::Passive),
            "proactive" => Ok(AssistantMode::Proactive),
            "focused" => Ok(AssistantMode::Focused),
            "collaborative" => Ok(AssistantMode::Collaborative),
            "disabled" => Ok(AssistantMode::Disabled),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

/// 通知窗口：截断后的洞察与建议
#[derive(Clone, Debug, Default, Serialize)]
pub struct NotificationWindow {
    pub insights: Vec<Insight>,
    pub suggestions: Vec<Suggestion>,
}

/// 展示层看到的「投影」状态
#[derive(Clone, Debug, Default, Serialize)]
pub struct FeedState {
    pub mode: AssistantMode,
    pub actors: Vec<ActorInstance>,
    pub window: NotificationWindow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_emission_policy() {
        assert!(!AssistantMode::Disabled.emits_insights());
        assert!(!AssistantMode::Disabled.emits_suggestions());
        assert!(AssistantMode::Passive.emits_insights());
        assert!(!AssistantMode::Passive.emits_suggestions());
        assert!(AssistantMode::Collaborative.emits_suggestions());
    }

    #[test]
    fn test_mode_parse_roundtrip_names() {
        assert_eq!("Focused".parse::<AssistantMode>().unwrap(), AssistantMode::Focused);
        assert_eq!(AssistantMode::Disabled.to_string(), "disabled");
        assert!("loud".parse::<AssistantMode>().is_err());
    }
}
