//! 存储变更事件：每次修改 ActorInstance 后广播，供展示层与 FeedState 投影订阅

use serde::Serialize;

use crate::chat::Message;
use crate::core::{ActorId, ActorStatus, Task};
use crate::insight::{Insight, Suggestion};

/// 单次变更事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StudioEvent {
    StatusChanged { actor: ActorId, status: ActorStatus },
    EnabledChanged { actor: ActorId, enabled: bool },
    TaskStarted { actor: ActorId, task: Task },
    /// 进度检查点（0-100，单调不减）
    TaskProgress {
        actor: ActorId,
        task_id: String,
        progress: u8,
    },
    /// 任务结束（complete 或 fail），携带终态快照
    TaskFinished { actor: ActorId, task: Task },
    InsightAdded { insight: Insight },
    InsightDismissed { actor: ActorId, insight_id: String },
    /// actor 为 None 表示清空全部助手
    InsightsCleared { actor: Option<ActorId> },
    SuggestionAdded { suggestion: Suggestion },
    SuggestionApplied { actor: ActorId, suggestion_id: String },
    SuggestionDismissed { actor: ActorId, suggestion_id: String },
    MessageAppended { actor: ActorId, message: Message },
    /// 占位消息已解析为正式回复
    MessageResolved { actor: ActorId, message: Message },
    ChatCleared { actor: ActorId },
    Reset,
}
