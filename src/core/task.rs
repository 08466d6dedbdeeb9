//! 任务生命周期：每个助手同一时间最多一个进行中的任务
//!
//! 任务 ID 是能力令牌：progress / complete / fail 携带的 ID 与当前任务不匹配时静默丢弃，
//! 这替代了显式取消，避免过期的异步更新破坏状态。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, StudioError};
use crate::core::events::StudioEvent;
use crate::core::store::InstanceStore;
use crate::core::{ActorId, ActorStatus};

/// 任务 ID
pub type TaskId = String;

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Complete,
    Error,
}

/// 任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Analysis,
    Generation,
    Search,
    Review,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    pub description: String,
    pub status: TaskStatus,
    /// 0-100
    pub progress: u8,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// 启动任务所需的描述
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub kind: TaskKind,
    pub description: String,
    /// 任务期间助手的状态（通常是忙碌态）
    pub status: ActorStatus,
}

impl TaskSpec {
    pub fn new(kind: TaskKind, description: impl Into<String>) -> Self {
        let status = match kind {
            TaskKind::Analysis => ActorStatus::Analyzing,
            TaskKind::Search | TaskKind::Review => ActorStatus::Observing,
            TaskKind::Generation => ActorStatus::Working,
        };
        Self {
            kind,
            description: description.into(),
            status,
        }
    }

    pub fn with_status(mut self, status: ActorStatus) -> Self {
        self.status = status;
        self
    }
}

/// 任务管理器（无状态，所有数据都在 InstanceStore 中）
#[derive(Clone, Copy)]
pub struct TaskManager<'a> {
    store: &'a InstanceStore,
}

impl<'a> TaskManager<'a> {
    pub fn new(store: &'a InstanceStore) -> Self {
        Self { store }
    }

    /// 启动任务；该助手已有任务时返回 TaskAlreadyRunning
    pub async fn start(&self, actor: ActorId, spec: TaskSpec) -> Result<TaskId> {
        let started = self
            .store
            .update(actor, |inst| {
                if let Some(current) = &inst.current_task {
                    return Err(StudioError::TaskAlreadyRunning {
                        actor: actor.to_string(),
                        task_id: current.id.clone(),
                    });
                }
                let task = Task {
                    id: format!("task_{}", uuid::Uuid::new_v4()),
                    kind: spec.kind,
                    description: spec.description,
                    status: TaskStatus::Running,
                    progress: 0,
                    started_at: Utc::now(),
                    completed_at: None,
                    result: None,
                    error: None,
                };
                inst.current_task = Some(task.clone());
                inst.status = spec.status;
                inst.touch();
                Ok(task)
            })
            .await??;

        tracing::info!(%actor, task_id = %started.id, kind = ?started.kind, "Task started");
        let task_id = started.id.clone();
        self.store.emit(StudioEvent::StatusChanged {
            actor,
            status: spec.status,
        });
        self.store.emit(StudioEvent::TaskStarted { actor, task: started });
        Ok(task_id)
    }

    /// 更新进度（截断到 100，且不回退）；ID 过期时静默忽略并返回 false
    pub async fn update_progress(&self, actor: ActorId, task_id: &str, progress: u8) -> Result<bool> {
        let applied = self
            .store
            .update(actor, |inst| match inst.current_task.as_mut() {
                Some(task) if task.id == task_id => {
                    task.progress = progress.min(100).max(task.progress);
                    let p = task.progress;
                    inst.touch();
                    Some(p)
                }
                _ => None,
            })
            .await?;

        match applied {
            Some(progress) => self.store.emit(StudioEvent::TaskProgress {
                actor,
                task_id: task_id.to_string(),
                progress,
            }),
            None => tracing::debug!(%actor, task_id, "Dropped stale progress update"),
        }
        Ok(applied.is_some())
    }

    /// task_id 是否仍是该助手的当前任务
    pub async fn is_current(&self, actor: ActorId, task_id: &str) -> Result<bool> {
        Ok(self.store.snapshot(actor).await?.current_task_is(task_id))
    }

    /// 完成任务：清空 current_task，状态回到 Idle
    pub async fn complete(
        &self,
        actor: ActorId,
        task_id: &str,
        result: Option<serde_json::Value>,
    ) -> Result<bool> {
        self.finish(actor, task_id, |task| {
            task.status = TaskStatus::Complete;
            task.progress = 100;
            task.result = result;
            ActorStatus::Idle
        })
        .await
    }

    /// 任务失败：清空 current_task 并记录错误，状态置为 Error
    pub async fn fail(&self, actor: ActorId, task_id: &str, error: impl Into<String>) -> Result<bool> {
        let error = error.into();
        self.finish(actor, task_id, |task| {
            task.status = TaskStatus::Error;
            task.error = Some(error);
            ActorStatus::Error
        })
        .await
    }

    async fn finish(
        &self,
        actor: ActorId,
        task_id: &str,
        seal: impl FnOnce(&mut Task) -> ActorStatus,
    ) -> Result<bool> {
        let finished = self
            .store
            .update(actor, |inst| {
                if !inst.current_task_is(task_id) {
                    return None;
                }
                let mut task = inst.current_task.take()?;
                let status = seal(&mut task);
                task.completed_at = Some(Utc::now());
                inst.status = status;
                inst.touch();
                Some((task, status))
            })
            .await?;

        let applied = finished.is_some();
        match finished {
            Some((task, status)) => {
                match task.status {
                    TaskStatus::Error => tracing::warn!(
                        %actor,
                        task_id,
                        error = task.error.as_deref().unwrap_or(""),
                        "Task failed"
                    ),
                    _ => tracing::info!(%actor, task_id, "Task complete"),
                }
                self.store.emit(StudioEvent::TaskFinished { actor, task });
                self.store.emit(StudioEvent::StatusChanged { actor, status });
            }
            None => tracing::debug!(%actor, task_id, "Dropped stale task completion"),
        }
        Ok(applied)
    }
}
