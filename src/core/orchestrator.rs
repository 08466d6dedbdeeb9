//! Studio 编排器：显式上下文对象与主控循环
//!
//! Studio 持有注册表、实例存储、分析器、规则表与全局模式，所有组件从它借用存储；
//! create_studio 建立 cmd / feed / event 三通道，在后台任务中消费命令并在每次存储变更后重算 FeedState。

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::chat::{ChatPipeline, MessageId};
use crate::config::{load_config, AppConfig};
use crate::core::builder::StudioBuilder;
use crate::core::error::{Result, StudioError};
use crate::core::{
    Actor, ActorId, ActorInstance, ActorRegistry, ActorStatus, Aggregator, AssistantMode, FeedState,
    InstanceStore, NotificationWindow, StudioEvent, TaskManager,
};
use crate::insight::{AnalysisProvider, AnalysisResult, Insight, InsightPipeline, RuleTable, SubjectPayload, Suggestion};

/// 负责分析上传素材的助手
pub const UPLOAD_ANALYST: ActorId = ActorId::Analyst;

struct StudioInner {
    config: AppConfig,
    registry: ActorRegistry,
    store: InstanceStore,
    provider: Arc<dyn AnalysisProvider>,
    rules: RuleTable,
    mode: watch::Sender<AssistantMode>,
}

/// 应用根持有的上下文对象；Clone 只复制 Arc
#[derive(Clone)]
pub struct Studio {
    inner: Arc<StudioInner>,
}

impl Studio {
    pub fn new(config: AppConfig) -> Self {
        StudioBuilder::new(config).build()
    }

    pub fn builder(config: AppConfig) -> StudioBuilder {
        StudioBuilder::new(config)
    }

    pub(crate) fn from_parts(config: AppConfig, provider: Arc<dyn AnalysisProvider>, rules: RuleTable) -> Self {
        let registry = ActorRegistry::new();
        let store = InstanceStore::new(&registry, config.chat.history_limit);
        let (mode, _) = watch::channel(config.app.mode);
        Self {
            inner: Arc::new(StudioInner {
                config,
                registry,
                store,
                provider,
                rules,
                mode,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &ActorRegistry {
        &self.inner.registry
    }

    pub fn store(&self) -> &InstanceStore {
        &self.inner.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.inner.store.subscribe()
    }

    /// 按字符串 ID 查找助手
    pub fn actor(&self, actor_id: &str) -> Result<&'static Actor> {
        self.inner.registry.get(actor_id)
    }

    pub fn mode(&self) -> AssistantMode {
        *self.inner.mode.borrow()
    }

    pub fn set_mode(&self, mode: AssistantMode) {
        let previous = self.inner.mode.send_replace(mode);
        if previous != mode {
            tracing::info!(%previous, %mode, "Assistant mode changed");
        }
    }

    pub fn tasks(&self) -> TaskManager<'_> {
        TaskManager::new(&self.inner.store)
    }

    pub fn insights(&self) -> InsightPipeline<'_> {
        InsightPipeline::new(
            &self.inner.store,
            self.inner.provider.as_ref(),
            &self.inner.rules,
            self.inner.mode.subscribe(),
            &self.inner.config.analysis,
        )
    }

    pub fn chat(&self) -> ChatPipeline<'_> {
        ChatPipeline::new(&self.inner.store, &self.inner.registry, &self.inner.config.chat)
    }

    pub fn aggregator(&self) -> Aggregator<'_> {
        Aggregator::new(&self.inner.store)
    }

    pub async fn analyze(&self, actor: ActorId, payload: &SubjectPayload) -> Result<AnalysisResult> {
        self.insights().analyze(actor, payload).await
    }

    /// 上传入口：在后台由分析助手处理
    pub fn upload(&self, payload: SubjectPayload) -> JoinHandle<Result<AnalysisResult>> {
        let studio = self.clone();
        tokio::spawn(async move { studio.analyze(UPLOAD_ANALYST, &payload).await })
    }

    /// 发送用户消息：立即返回占位消息 ID，回复在后台解析
    pub async fn send_message(&self, actor: ActorId, content: impl Into<String>) -> Result<MessageId> {
        let placeholder = self.chat().send_user_message(actor, content).await?;
        let studio = self.clone();
        let id = placeholder.clone();
        tokio::spawn(async move {
            if let Err(e) = studio.chat().resolve_typing(actor, &id).await {
                tracing::warn!(%actor, error = %e, "Typing resolution failed");
            }
        });
        Ok(placeholder)
    }

    pub async fn set_status(&self, actor: ActorId, status: ActorStatus) -> Result<()> {
        self.inner.store.set_status(actor, status).await
    }

    pub async fn set_enabled(&self, actor: ActorId, enabled: bool) -> Result<()> {
        self.inner.store.set_enabled(actor, enabled).await
    }

    pub async fn dismiss_insight(&self, actor: ActorId, insight_id: &str) -> Result<bool> {
        self.insights().dismiss_insight(actor, insight_id).await
    }

    pub async fn apply_suggestion(&self, actor: ActorId, suggestion_id: &str) -> Result<bool> {
        self.insights().apply_suggestion(actor, suggestion_id).await
    }

    pub async fn dismiss_suggestion(&self, actor: ActorId, suggestion_id: &str) -> Result<bool> {
        self.insights().dismiss_suggestion(actor, suggestion_id).await
    }

    pub async fn clear_insights(&self, actor: Option<ActorId>) -> Result<()> {
        self.inner.store.clear_insights(actor).await
    }

    pub async fn clear_chat(&self, actor: ActorId) -> Result<()> {
        self.chat().clear_history(actor).await
    }

    pub async fn reset(&self) {
        self.inner.store.reset().await
    }

    pub async fn snapshot(&self, actor: ActorId) -> Result<ActorInstance> {
        self.inner.store.snapshot(actor).await
    }

    pub async fn snapshots(&self) -> Vec<ActorInstance> {
        self.inner.store.snapshots().await
    }

    pub async fn active_insights(&self) -> Vec<Insight> {
        self.aggregator().active_insights().await
    }

    pub async fn active_suggestions(&self) -> Vec<Suggestion> {
        self.aggregator().active_suggestions().await
    }

    pub async fn notification_window(&self, max_insights: usize, max_suggestions: usize) -> NotificationWindow {
        self.aggregator()
            .notification_window(max_insights, max_suggestions)
            .await
    }

    /// 按配置的窗口大小生成展示投影
    pub async fn feed_state(&self) -> FeedState {
        let feed = &self.inner.config.feed;
        FeedState {
            mode: self.mode(),
            actors: self.snapshots().await,
            window: self
                .notification_window(feed.max_insights, feed.max_suggestions)
                .await,
        }
    }

    /// 执行单条命令；返回 false 表示应退出
    pub async fn execute(&self, cmd: Command) -> Result<bool> {
        match cmd {
            Command::Upload(payload) => {
                let handle = self.upload(payload);
                tokio::spawn(async move {
                    match handle.await {
                        Ok(Err(e @ StudioError::Superseded { .. })) => {
                            tracing::debug!(error = %e, "Upload analysis superseded")
                        }
                        Ok(Err(e)) => tracing::warn!(error = %e, "Upload analysis failed"),
                        Err(e) => tracing::warn!(error = %e, "Upload analysis task panicked"),
                        Ok(Ok(_)) => {}
                    }
                });
            }
            Command::Chat { actor, text } => {
                self.send_message(actor, text).await?;
            }
            Command::DismissInsight { actor, id } => {
                self.dismiss_insight(actor, &id).await?;
            }
            Command::ApplySuggestion { actor, id } => {
                self.apply_suggestion(actor, &id).await?;
            }
            Command::DismissSuggestion { actor, id } => {
                self.dismiss_suggestion(actor, &id).await?;
            }
            Command::SetEnabled { actor, enabled } => self.set_enabled(actor, enabled).await?,
            Command::SetMode(mode) => self.set_mode(mode),
            Command::ClearInsights(actor) => self.clear_insights(actor).await?,
            Command::ClearChat(actor) => self.clear_chat(actor).await?,
            Command::Reset => self.reset().await,
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }
}

/// 从展示层发往编排器的命令
#[derive(Debug, Clone)]
pub enum Command {
    /// 上传素材，触发分析助手
    Upload(SubjectPayload),
    /// 向某个助手发送消息
    Chat { actor: ActorId, text: String },
    DismissInsight { actor: ActorId, id: String },
    ApplySuggestion { actor: ActorId, id: String },
    DismissSuggestion { actor: ActorId, id: String },
    SetEnabled { actor: ActorId, enabled: bool },
    SetMode(AssistantMode),
    /// None 表示全部助手
    ClearInsights(Option<ActorId>),
    ClearChat(ActorId),
    /// 整个会话重置
    Reset,
    Quit,
}

impl Command {
    /// 解析一行文本命令（命令行前端使用）
    ///
    /// `upload <id> [text]` / `chat <actor> <text>` / `dismiss <actor> <insight>` /
    /// `apply|reject <actor> <suggestion>` / `enable|disable <actor>` / `mode <mode>` /
    /// `clear [actor]` / `clear-chat <actor>` / `reset` / `quit`
    pub fn parse_line(line: &str) -> std::result::Result<Command, String> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let mut args = rest.splitn(2, char::is_whitespace);
        let first = args.next().filter(|s| !s.is_empty());
        let tail = args.next().map(str::trim).unwrap_or("");

        let actor = |s: Option<&str>| -> std::result::Result<ActorId, String> {
            s.ok_or_else(|| format!("{verb}: missing actor"))?
                .parse::<ActorId>()
                .map_err(|e| e.to_string())
        };
        let target = |what: &str| -> std::result::Result<String, String> {
            if tail.is_empty() {
                Err(format!("{verb}: missing {what} id"))
            } else {
                Ok(tail.to_string())
            }
        };

        match verb.to_lowercase().as_str() {
            "upload" => {
                let id = first.ok_or("upload: missing subject id")?;
                Ok(Command::Upload(SubjectPayload::new(id, tail.as_bytes().to_vec())))
            }
            "chat" => {
                let actor = actor(first)?;
                if tail.is_empty() {
                    return Err("chat: missing message".to_string());
                }
                Ok(Command::Chat {
                    actor,
                    text: tail.to_string(),
                })
            }
            "dismiss" => Ok(Command::DismissInsight {
                actor: actor(first)?,
                id: target("insight")?,
            }),
            "apply" => Ok(Command::ApplySuggestion {
                actor: actor(first)?,
                id: target("suggestion")?,
            }),
            "reject" => Ok(Command::DismissSuggestion {
                actor: actor(first)?,
                id: target("suggestion")?,
            }),
            "enable" | "disable" => Ok(Command::SetEnabled {
                actor: actor(first)?,
                enabled: verb.eq_ignore_ascii_case("enable"),
            }),
            "mode" => Ok(Command::SetMode(first.ok_or("mode: missing value")?.parse()?)),
            "clear" => Ok(Command::ClearInsights(match first {
                Some(s) => Some(s.parse::<ActorId>().map_err(|e| e.to_string())?),
                None => None,
            })),
            "clear-chat" => Ok(Command::ClearChat(actor(first)?)),
            "reset" => Ok(Command::Reset),
            "quit" | "exit" => Ok(Command::Quit),
            "" => Err("empty command".to_string()),
            other => Err(format!("unknown command: {other}")),
        }
    }
}

/// 建立命令循环：返回命令发送端、FeedState 接收端、原始事件接收端
pub fn spawn_command_loop(
    studio: Studio,
) -> (
    mpsc::UnboundedSender<Command>,
    watch::Receiver<FeedState>,
    broadcast::Receiver<StudioEvent>,
) {
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let (feed_tx, feed_rx) = watch::channel(FeedState::default());
    let events_rx = studio.subscribe();
    let mut events = studio.subscribe();

    tokio::spawn(async move {
        let _ = feed_tx.send(studio.feed_state().await);
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    // cmd_tx 已关闭，退出循环
                    let Some(cmd) = cmd else { break };
                    let is_mode = matches!(cmd, Command::SetMode(_));
                    match studio.execute(cmd).await {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => tracing::warn!(error = %e, "Command failed"),
                    }
                    // 模式切换不经过存储，单独刷新
                    if is_mode {
                        let _ = feed_tx.send(studio.feed_state().await);
                    }
                }
                ev = events.recv() => {
                    match ev {
                        Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                            let _ = feed_tx.send(studio.feed_state().await);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
        tracing::info!("Studio command loop stopped");
    });

    (cmd_tx, feed_rx, events_rx)
}

/// 加载配置、构建 Studio 并启动命令循环
pub async fn create_studio(
    config_path: Option<PathBuf>,
) -> anyhow::Result<(
    Studio,
    mpsc::UnboundedSender<Command>,
    watch::Receiver<FeedState>,
    broadcast::Receiver<StudioEvent>,
)> {
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    let studio = Studio::new(cfg);
    let (cmd_tx, feed_rx, events_rx) = spawn_command_loop(studio.clone());
    Ok((studio, cmd_tx, feed_rx, events_rx))
}
