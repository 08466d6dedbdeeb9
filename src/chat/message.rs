//! 聊天消息
//!
//! `typing = true` 的消息是占位符，由聊天管线解析一次后不再回到输入中状态。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ActorId;

pub type MessageId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Actor,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub actor_id: Option<ActorId>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub typing: bool,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            sender: Sender::User,
            actor_id: None,
            content: content.into(),
            created_at: Utc::now(),
            typing: false,
        }
    }

    /// 助手的「正在输入」占位消息
    pub fn typing(actor_id: ActorId) -> Self {
        Self {
            id: new_message_id(),
            sender: Sender::Actor,
            actor_id: Some(actor_id),
            content: String::new(),
            created_at: Utc::now(),
            typing: true,
        }
    }
}

fn new_message_id() -> MessageId {
    format!("msg_{}", uuid::Uuid::new_v4())
}
