//! 助手实例存储：每个助手一份可变状态
//!
//! 每个实例是独立的 RwLock 单元，不同助手的修改互不阻塞；
//! 所有写操作都在单个实例的锁内完成，并在释放锁后广播 StudioEvent。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};

use crate::chat::{Message, MessageId};
use crate::core::error::{Result, StudioError};
use crate::core::events::StudioEvent;
use crate::core::{ActorId, ActorRegistry, ActorStatus, Task};
use crate::insight::{Insight, InsightId, Suggestion, SuggestionId};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// 单个助手的可变状态
#[derive(Clone, Debug, Serialize)]
pub struct ActorInstance {
    pub actor_id: ActorId,
    pub status: ActorStatus,
    pub current_task: Option<Task>,
    pub insights: Vec<Insight>,
    pub suggestions: Vec<Suggestion>,
    pub chat_history: Vec<Message>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub enabled: bool,
}

impl ActorInstance {
    pub fn new(actor_id: ActorId) -> Self {
        Self {
            actor_id,
            status: ActorStatus::Idle,
            current_task: None,
            insights: Vec::new(),
            suggestions: Vec::new(),
            chat_history: Vec::new(),
            last_activity_at: None,
            enabled: true,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity_at = Some(Utc::now());
    }

    pub fn current_task_is(&self, task_id: &str) -> bool {
        self.current_task.as_ref().is_some_and(|t| t.id == task_id)
    }

    /// 还有未解析的 typing 占位消息
    pub fn has_pending_reply(&self) -> bool {
        self.chat_history.iter().any(|m| m.typing)
    }

    pub fn active_insights(&self) -> impl Iterator<Item = &Insight> {
        self.insights.iter().filter(|i| i.is_active())
    }

    pub fn active_suggestions(&self) -> impl Iterator<Item = &Suggestion> {
        self.suggestions.iter().filter(|s| s.is_active())
    }
}

/// 实例存储（唯一的共享可变资源）
pub struct InstanceStore {
    cells: HashMap<ActorId, RwLock<ActorInstance>>,
    /// 声明顺序
    order: Vec<ActorId>,
    /// 洞察/建议的全局写入序号
    seq: AtomicU64,
    /// 每个助手保留的聊天消息上限
    history_limit: usize,
    events: broadcast::Sender<StudioEvent>,
}

impl InstanceStore {
    pub fn new(registry: &ActorRegistry, history_limit: usize) -> Self {
        let order: Vec<ActorId> = registry.all().iter().map(|a| a.id).collect();
        let cells = order
            .iter()
            .map(|id| (*id, RwLock::new(ActorInstance::new(*id))))
            .collect();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            cells,
            order,
            seq: AtomicU64::new(0),
            history_limit: history_limit.max(1),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: StudioEvent) {
        // 无订阅者时 send 返回 Err，忽略
        let _ = self.events.send(event);
    }

    fn cell(&self, actor: ActorId) -> Result<&RwLock<ActorInstance>> {
        self.cells
            .get(&actor)
            .ok_or_else(|| StudioError::UnknownActor(actor.to_string()))
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// 在单个实例的写锁内执行修改（任务管理器通过它完成原子的检查与写入）
    pub(crate) async fn update<R>(
        &self,
        actor: ActorId,
        f: impl FnOnce(&mut ActorInstance) -> R,
    ) -> Result<R> {
        let mut inst = self.cell(actor)?.write().await;
        Ok(f(&mut inst))
    }

    /// 只读快照
    pub async fn snapshot(&self, actor: ActorId) -> Result<ActorInstance> {
        Ok(self.cell(actor)?.read().await.clone())
    }

    /// 按声明顺序返回全部快照
    pub async fn snapshots(&self) -> Vec<ActorInstance> {
        let mut out = Vec::with_capacity(self.order.len());
        for id in &self.order {
            if let Ok(cell) = self.cell(*id) {
                out.push(cell.read().await.clone());
            }
        }
        out
    }

    /// 无条件设置状态，并刷新 last_activity_at
    pub async fn set_status(&self, actor: ActorId, status: ActorStatus) -> Result<()> {
        self.update(actor, |inst| {
            inst.status = status;
            inst.touch();
        })
        .await?;
        self.emit(StudioEvent::StatusChanged { actor, status });
        Ok(())
    }

    /// 禁用的助手保留数据，但不进入跨助手视图
    pub async fn set_enabled(&self, actor: ActorId, enabled: bool) -> Result<()> {
        self.update(actor, |inst| inst.enabled = enabled).await?;
        tracing::info!(%actor, enabled, "Actor enablement changed");
        self.emit(StudioEvent::EnabledChanged { actor, enabled });
        Ok(())
    }

    /// 将所有实例恢复为初始空状态（注册表不受影响）
    pub async fn reset(&self) {
        for id in &self.order {
            if let Ok(cell) = self.cell(*id) {
                *cell.write().await = ActorInstance::new(*id);
            }
        }
        tracing::info!("Studio state reset");
        self.emit(StudioEvent::Reset);
    }

    /// 追加洞察，按给定顺序写入；序号在实例锁内分配
    pub async fn append_insights(&self, actor: ActorId, insights: Vec<Insight>) -> Result<Vec<InsightId>> {
        Ok(self
            .push_insights(actor, None, insights)
            .await?
            .unwrap_or_default())
    }

    /// 仅当 task_id 仍是该助手的当前任务时写入；任务已被取代时返回 None
    pub(crate) async fn append_insights_for_task(
        &self,
        actor: ActorId,
        task_id: &str,
        insights: Vec<Insight>,
    ) -> Result<Option<Vec<InsightId>>> {
        self.push_insights(actor, Some(task_id), insights).await
    }

    async fn push_insights(
        &self,
        actor: ActorId,
        task_id: Option<&str>,
        insights: Vec<Insight>,
    ) -> Result<Option<Vec<InsightId>>> {
        let stamped = self
            .update(actor, |inst| {
                if task_id.is_some_and(|id| !inst.current_task_is(id)) {
                    return None;
                }
                let stamped: Vec<Insight> = insights
                    .into_iter()
                    .map(|mut i| {
                        i.actor_id = actor;
                        i.seq = self.next_seq();
                        i
                    })
                    .collect();
                inst.insights.extend(stamped.iter().cloned());
                inst.touch();
                Some(stamped)
            })
            .await?;
        let Some(stamped) = stamped else {
            return Ok(None);
        };
        let ids = stamped.iter().map(|i| i.id.clone()).collect();
        for insight in stamped {
            self.emit(StudioEvent::InsightAdded { insight });
        }
        Ok(Some(ids))
    }

    pub async fn append_suggestion(&self, actor: ActorId, suggestion: Suggestion) -> Result<SuggestionId> {
        let stored = self
            .update(actor, |inst| push_suggestion(inst, suggestion, self.next_seq()))
            .await?;
        let id = stored.id.clone();
        self.emit(StudioEvent::SuggestionAdded { suggestion: stored });
        Ok(id)
    }

    /// 向 target 追加建议，前提是 origin 的当前任务仍为 task_id
    ///
    /// 两个实例锁按声明顺序获取，检查与写入期间 origin 不会被重置。
    pub(crate) async fn append_suggestion_for_task(
        &self,
        origin: ActorId,
        task_id: &str,
        target: ActorId,
        suggestion: Suggestion,
    ) -> Result<Option<SuggestionId>> {
        let stored = if origin == target {
            self.update(target, |inst| {
                inst.current_task_is(task_id)
                    .then(|| push_suggestion(inst, suggestion, self.next_seq()))
            })
            .await?
        } else {
            let origin_cell = self.cell(origin)?;
            let target_cell = self.cell(target)?;
            let (origin_inst, mut target_inst) = if (origin as usize) < (target as usize) {
                let o = origin_cell.read().await;
                let t = target_cell.write().await;
                (o, t)
            } else {
                let t = target_cell.write().await;
                let o = origin_cell.read().await;
                (o, t)
            };
            origin_inst
                .current_task_is(task_id)
                .then(|| push_suggestion(&mut target_inst, suggestion, self.next_seq()))
        };
        Ok(stored.map(|suggestion| {
            let id = suggestion.id.clone();
            self.emit(StudioEvent::SuggestionAdded { suggestion });
            id
        }))
    }

    /// 单向置 dismissed；已忽略或不存在时返回 false
    pub async fn dismiss_insight(&self, actor: ActorId, insight_id: &str) -> Result<bool> {
        let flipped = self
            .update(actor, |inst| {
                match inst.insights.iter_mut().find(|i| i.id == insight_id) {
                    Some(i) if !i.dismissed => {
                        i.dismissed = true;
                        inst.touch();
                        true
                    }
                    _ => false,
                }
            })
            .await?;
        if flipped {
            self.emit(StudioEvent::InsightDismissed {
                actor,
                insight_id: insight_id.to_string(),
            });
        }
        Ok(flipped)
    }

    /// 批量清空洞察；actor 为 None 时清空所有助手
    pub async fn clear_insights(&self, actor: Option<ActorId>) -> Result<()> {
        let targets = match actor {
            Some(id) => vec![id],
            None => self.order.clone(),
        };
        for id in targets {
            self.update(id, |inst| {
                inst.insights.clear();
                inst.touch();
            })
            .await?;
        }
        self.emit(StudioEvent::InsightsCleared { actor });
        Ok(())
    }

    pub async fn apply_suggestion(&self, actor: ActorId, suggestion_id: &str) -> Result<bool> {
        let flipped = self
            .update(actor, |inst| flip_suggestion(inst, suggestion_id, |s| s.applied = true))
            .await?;
        if flipped {
            self.emit(StudioEvent::SuggestionApplied {
                actor,
                suggestion_id: suggestion_id.to_string(),
            });
        }
        Ok(flipped)
    }

    pub async fn dismiss_suggestion(&self, actor: ActorId, suggestion_id: &str) -> Result<bool> {
        let flipped = self
            .update(actor, |inst| flip_suggestion(inst, suggestion_id, |s| s.dismissed = true))
            .await?;
        if flipped {
            self.emit(StudioEvent::SuggestionDismissed {
                actor,
                suggestion_id: suggestion_id.to_string(),
            });
        }
        Ok(flipped)
    }

    /// 追加聊天消息，超出上限时丢弃最旧的消息
    pub async fn push_message(&self, actor: ActorId, message: Message) -> Result<MessageId> {
        let id = message.id.clone();
        let event = StudioEvent::MessageAppended {
            actor,
            message: message.clone(),
        };
        let limit = self.history_limit;
        self.update(actor, |inst| {
            inst.chat_history.push(message);
            if inst.chat_history.len() > limit {
                let overflow = inst.chat_history.len() - limit;
                inst.chat_history.drain(..overflow);
            }
            inst.touch();
        })
        .await?;
        self.emit(event);
        Ok(id)
    }

    /// 解析占位消息：仅当消息仍存在且处于 typing 时写入内容
    pub async fn resolve_message(&self, actor: ActorId, message_id: &str, content: String) -> Result<bool> {
        let resolved = self
            .update(actor, |inst| {
                let msg = inst
                    .chat_history
                    .iter_mut()
                    .find(|m| m.id == message_id && m.typing)?;
                msg.content = content;
                msg.typing = false;
                let msg = msg.clone();
                inst.touch();
                Some(msg)
            })
            .await?;
        match resolved {
            Some(message) => {
                self.emit(StudioEvent::MessageResolved { actor, message });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn clear_chat(&self, actor: ActorId) -> Result<()> {
        self.update(actor, |inst| {
            inst.chat_history.clear();
            inst.touch();
        })
        .await?;
        self.emit(StudioEvent::ChatCleared { actor });
        Ok(())
    }
}

fn push_suggestion(inst: &mut ActorInstance, mut suggestion: Suggestion, seq: u64) -> Suggestion {
    suggestion.actor_id = inst.actor_id;
    suggestion.seq = seq;
    inst.suggestions.push(suggestion.clone());
    inst.touch();
    suggestion
}

/// applied / dismissed 互斥：已是终态的建议保持不变
fn flip_suggestion(inst: &mut ActorInstance, suggestion_id: &str, mark: impl FnOnce(&mut Suggestion)) -> bool {
    match inst.suggestions.iter_mut().find(|s| s.id == suggestion_id) {
        Some(s) if s.is_active() => {
            mark(s);
            inst.touch();
            true
        }
        _ => false,
    }
}
