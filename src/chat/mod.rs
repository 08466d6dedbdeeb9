//! 聊天层：消息模型、回复生成、占位消息管线

pub mod message;
pub mod pipeline;
pub mod responder;

pub use message::{Message, MessageId, Sender};
pub use pipeline::{thinking_latency, ChatPipeline};
pub use responder::{generate_response, normalize};
