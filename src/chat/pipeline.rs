//! 聊天管线：用户消息 -> 占位消息 -> 延迟后解析为回复
//!
//! 占位消息按 ID 定位；若在「思考」期间被清空，解析静默丢弃。

use std::time::Duration;

use rand::Rng;

use crate::chat::message::{Message, MessageId, Sender};
use crate::chat::responder::generate_response;
use crate::config::ChatSection;
use crate::core::error::Result;
use crate::core::events::StudioEvent;
use crate::core::store::InstanceStore;
use crate::core::{ActorId, ActorRegistry, ActorStatus};

/// 思考延迟：base + per_char * len + jitter，上限 max
pub fn thinking_latency(settings: &ChatSection, text_len: usize, jitter_ms: u64) -> Duration {
    let ms = settings
        .base_latency_ms
        .saturating_add(settings.per_char_ms.saturating_mul(text_len as u64))
        .saturating_add(jitter_ms.min(settings.jitter_ms));
    Duration::from_millis(ms.min(settings.max_latency_ms))
}

pub struct ChatPipeline<'a> {
    store: &'a InstanceStore,
    registry: &'a ActorRegistry,
    settings: &'a ChatSection,
}

impl<'a> ChatPipeline<'a> {
    pub fn new(store: &'a InstanceStore, registry: &'a ActorRegistry, settings: &'a ChatSection) -> Self {
        Self {
            store,
            registry,
            settings,
        }
    }

    /// 追加用户消息与 typing 占位消息，立即返回占位消息 ID
    pub async fn send_user_message(&self, actor: ActorId, content: impl Into<String>) -> Result<MessageId> {
        self.store.push_message(actor, Message::user(content)).await?;
        let placeholder = self.store.push_message(actor, Message::typing(actor)).await?;

        // 有任务在跑时保留任务状态
        if self.store.snapshot(actor).await?.current_task.is_none() {
            self.store.set_status(actor, ActorStatus::Thinking).await?;
        }
        Ok(placeholder)
    }

    /// 等待思考延迟后解析占位消息；返回是否真正写入
    pub async fn resolve_typing(&self, actor: ActorId, message_id: &str) -> Result<bool> {
        let Some(user_text) = self.prompt_for(actor, message_id).await? else {
            tracing::debug!(%actor, message_id, "Typing placeholder not found, dropping resolution");
            self.settle_status(actor).await?;
            return Ok(false);
        };

        let jitter = if self.settings.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.settings.jitter_ms)
        } else {
            0
        };
        let latency = thinking_latency(self.settings, user_text.chars().count(), jitter);
        tokio::time::sleep(latency).await;

        let reply = generate_response(self.registry.actor(actor), &user_text);
        let resolved = self.store.resolve_message(actor, message_id, reply).await?;
        self.settle_status(actor).await?;
        if !resolved {
            tracing::debug!(%actor, message_id, "Placeholder removed while thinking, dropping reply");
            return Ok(false);
        }
        tracing::info!(%actor, latency_ms = latency.as_millis() as u64, "Chat reply resolved");
        Ok(true)
    }

    /// Thinking 只在没有任务、也没有待解析占位消息时回到 Idle
    async fn settle_status(&self, actor: ActorId) -> Result<()> {
        let settled = self
            .store
            .update(actor, |inst| {
                let idle = inst.status == ActorStatus::Thinking
                    && inst.current_task.is_none()
                    && !inst.has_pending_reply();
                if idle {
                    inst.status = ActorStatus::Idle;
                    inst.touch();
                }
                idle
            })
            .await?;
        if settled {
            self.store.emit(StudioEvent::StatusChanged {
                actor,
                status: ActorStatus::Idle,
            });
        }
        Ok(())
    }

    /// 找到占位消息之前最近的一条用户消息；占位消息不存在或已解析时返回 None
    async fn prompt_for(&self, actor: ActorId, message_id: &str) -> Result<Option<String>> {
        let snap = self.store.snapshot(actor).await?;
        let Some(idx) = snap
            .chat_history
            .iter()
            .position(|m| m.id == message_id && m.typing)
        else {
            return Ok(None);
        };
        let text = snap.chat_history[..idx]
            .iter()
            .rev()
            .find(|m| m.sender == Sender::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(Some(text))
    }

    pub async fn clear_history(&self, actor: ActorId) -> Result<()> {
        self.store.clear_chat(actor).await?;
        self.settle_status(actor).await
    }
}
