//! 核心编排层：注册表、实例存储、任务生命周期、聚合视图、事件与主控循环

pub mod aggregator;
pub mod builder;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod registry;
pub mod state;
pub mod store;
pub mod task;

pub use aggregator::Aggregator;
pub use builder::StudioBuilder;
pub use error::{Result, StudioError};
pub use events::StudioEvent;
pub use orchestrator::{create_studio, spawn_command_loop, Command, Studio, UPLOAD_ANALYST};
pub use registry::{Actor, ActorId, ActorRegistry};
pub use state::{ActorStatus, AssistantMode, FeedState, NotificationWindow};
pub use store::{ActorInstance, InstanceStore};
pub use task::{Task, TaskId, TaskKind, TaskManager, TaskSpec, TaskStatus};
