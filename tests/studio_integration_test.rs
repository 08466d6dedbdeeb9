//! Studio 端到端测试：分析管线、聊天管线、聚合窗口与重置

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;
use tokio::time::timeout;

use atelier::config::AppConfig;
use atelier::core::{
    spawn_command_loop, ActorId, ActorStatus, AssistantMode, Command, Studio, StudioError, StudioEvent,
    TaskKind, TaskSpec,
};
use atelier::insight::{
    AnalysisProvider, AnalysisResult, ColorSummary, CompositionSummary, FixedProvider, Impact, Insight,
    InsightType, QualitySummary, StyleSummary, SubjectPayload, SubjectSummary, Suggestion, SuggestionType,
};

fn weak_result() -> AnalysisResult {
    AnalysisResult {
        subject_id: String::new(),
        colors: ColorSummary {
            dominant: vec!["#0ea5e9".into(), "#f59e0b".into()],
            harmony: "complementary".into(),
            saturation: 80,
        },
        composition: CompositionSummary {
            rule: "rule of thirds".into(),
            balance: 50,
            focal_points: 3,
        },
        style: StyleSummary {
            primary: "watercolor".into(),
            secondary: vec![],
            confidence: 72,
        },
        quality: QualitySummary {
            sharpness: 70,
            exposure: 75,
            noise: 20,
            score: 75,
        },
        subject: SubjectSummary {
            primary: "landscape".into(),
            tags: vec!["outdoor".into()],
        },
    }
}

fn studio_with(result: AnalysisResult) -> Studio {
    Studio::builder(AppConfig::instant())
        .with_provider(Arc::new(FixedProvider::new(result)))
        .build()
}

struct OfflineProvider;

#[async_trait]
impl AnalysisProvider for OfflineProvider {
    async fn provide(&self, _payload: &SubjectPayload) -> Result<AnalysisResult, String> {
        Err("provider offline".to_string())
    }
}

/// 进入 provide 后挂起，直到测试放行
struct GatedProvider {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl AnalysisProvider for GatedProvider {
    async fn provide(&self, payload: &SubjectPayload) -> Result<AnalysisResult, String> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(AnalysisResult {
            subject_id: payload.subject_id.clone(),
            ..weak_result()
        })
    }
}

#[tokio::test]
async fn test_analyze_end_to_end_ordering() {
    let studio = studio_with(weak_result());
    let mut rx = studio.subscribe();

    studio
        .analyze(ActorId::Analyst, &SubjectPayload::new("img-42", vec![7; 16]))
        .await
        .unwrap();

    let mut progress = Vec::new();
    let mut seen_insight = false;
    let mut suggestions = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        match ev {
            StudioEvent::TaskProgress { actor, progress: p, .. } => {
                assert_eq!(actor, ActorId::Analyst);
                assert!(!seen_insight, "progress after insights");
                progress.push(p);
            }
            StudioEvent::InsightAdded { insight } => {
                assert_eq!(insight.actor_id, ActorId::Analyst);
                assert!(suggestions.is_empty(), "insight after suggestion");
                seen_insight = true;
            }
            StudioEvent::SuggestionAdded { suggestion } => {
                assert!(seen_insight);
                suggestions.push(suggestion);
            }
            _ => {}
        }
    }

    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress.last(), Some(&100));
    assert!(seen_insight);
    assert_eq!(suggestions.len(), 1);
    assert_ne!(suggestions[0].actor_id, ActorId::Analyst);

    let analyst = studio.snapshot(ActorId::Analyst).await.unwrap();
    assert!(analyst.current_task.is_none());
    assert_eq!(analyst.status, ActorStatus::Idle);
    let composer = studio.snapshot(ActorId::Composer).await.unwrap();
    assert_eq!(composer.suggestions.len(), 1);
}

#[tokio::test]
async fn test_provider_failure_puts_actor_in_error() {
    let studio = Studio::builder(AppConfig::instant())
        .with_provider(Arc::new(OfflineProvider))
        .build();

    let err = studio
        .analyze(ActorId::Analyst, &SubjectPayload::new("img-1", Vec::new()))
        .await
        .unwrap_err();
    assert_eq!(err, StudioError::Provider("provider offline".to_string()));
    assert!(studio.active_insights().await.is_empty());
    assert!(studio.active_suggestions().await.is_empty());

    let analyst = studio.snapshot(ActorId::Analyst).await.unwrap();
    assert_eq!(analyst.status, ActorStatus::Error);
    assert!(analyst.current_task.is_none());

    // 错误状态可以通过开始新任务恢复
    studio
        .tasks()
        .start(ActorId::Analyst, TaskSpec::new(TaskKind::Analysis, "retry"))
        .await
        .unwrap();
    assert_eq!(
        studio.snapshot(ActorId::Analyst).await.unwrap().status,
        ActorStatus::Analyzing
    );
}

#[tokio::test]
async fn test_concurrent_upload_is_rejected_for_same_actor() {
    let mut config = AppConfig::instant();
    config.analysis.stage_delay_ms = 50;
    let studio = Studio::builder(config)
        .with_provider(Arc::new(FixedProvider::new(weak_result())))
        .build();

    let first = studio.upload(SubjectPayload::new("a", Vec::new()));
    // 等第一个任务真正开始
    let mut rx = studio.subscribe();
    timeout(Duration::from_secs(2), async {
        loop {
            if studio.snapshot(ActorId::Analyst).await.unwrap().current_task.is_some() {
                break;
            }
            let _ = rx.recv().await;
        }
    })
    .await
    .unwrap();

    let second = studio
        .analyze(ActorId::Analyst, &SubjectPayload::new("b", Vec::new()))
        .await;
    assert!(matches!(second, Err(StudioError::TaskAlreadyRunning { .. })));
    assert!(first.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_reset_during_analysis_discards_results() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let studio = Studio::builder(AppConfig::instant())
        .with_provider(Arc::new(GatedProvider {
            entered: entered.clone(),
            release: release.clone(),
        }))
        .build();

    let upload = studio.upload(SubjectPayload::new("img-8", Vec::new()));
    timeout(Duration::from_secs(2), entered.notified()).await.unwrap();
    studio.reset().await;
    release.notify_one();

    let outcome = timeout(Duration::from_secs(2), upload).await.unwrap().unwrap();
    assert!(matches!(outcome, Err(StudioError::Superseded { .. })));

    for snap in studio.snapshots().await {
        assert!(snap.insights.is_empty());
        assert!(snap.suggestions.is_empty());
        assert!(snap.current_task.is_none());
        assert_eq!(snap.status, ActorStatus::Idle);
    }
}

#[tokio::test]
async fn test_mode_flag_gates_emission() {
    let studio = studio_with(weak_result());

    studio.set_mode(AssistantMode::Disabled);
    studio
        .analyze(ActorId::Analyst, &SubjectPayload::new("img-1", Vec::new()))
        .await
        .unwrap();
    assert!(studio.active_insights().await.is_empty());
    assert!(studio.active_suggestions().await.is_empty());

    studio.set_mode(AssistantMode::Passive);
    studio
        .analyze(ActorId::Analyst, &SubjectPayload::new("img-2", Vec::new()))
        .await
        .unwrap();
    assert!(!studio.active_insights().await.is_empty());
    assert!(studio.active_suggestions().await.is_empty());
}

#[tokio::test]
async fn test_chat_placeholder_is_resolved_in_place() {
    let mut config = AppConfig::instant();
    config.chat.base_latency_ms = 50;
    config.chat.max_latency_ms = 50;
    let studio = Studio::new(config);
    let mut rx = studio.subscribe();

    let placeholder = studio.send_message(ActorId::Scout, "find styles").await.unwrap();

    let snap = studio.snapshot(ActorId::Scout).await.unwrap();
    assert_eq!(snap.chat_history.len(), 2);
    assert_eq!(snap.chat_history[0].content, "find styles");
    assert!(snap.chat_history[1].typing);
    assert_eq!(snap.chat_history[1].id, placeholder);

    let resolved = timeout(Duration::from_secs(2), async {
        loop {
            if let Ok(StudioEvent::MessageResolved { message, .. }) = rx.recv().await {
                return message;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(resolved.id, placeholder);

    let snap = studio.snapshot(ActorId::Scout).await.unwrap();
    assert_eq!(snap.chat_history.len(), 2);
    let replies: Vec<_> = snap
        .chat_history
        .iter()
        .filter(|m| m.actor_id == Some(ActorId::Scout))
        .collect();
    assert_eq!(replies.len(), 1);
    assert!(!replies[0].typing);
    assert!(!replies[0].content.is_empty());
    assert_eq!(replies[0].id, placeholder);
}

#[tokio::test]
async fn test_clearing_chat_while_thinking_returns_to_idle() {
    let mut config = AppConfig::instant();
    config.chat.base_latency_ms = 50;
    config.chat.max_latency_ms = 50;
    let studio = Studio::new(config);

    studio.send_message(ActorId::Scout, "find styles").await.unwrap();
    assert_eq!(
        studio.snapshot(ActorId::Scout).await.unwrap().status,
        ActorStatus::Thinking
    );
    studio.clear_chat(ActorId::Scout).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let snap = studio.snapshot(ActorId::Scout).await.unwrap();
    assert!(snap.chat_history.is_empty());
    assert_eq!(snap.status, ActorStatus::Idle);
}

#[tokio::test]
async fn test_notification_window_over_mixed_actors() {
    let studio = Studio::new(AppConfig::instant());
    let store = studio.store();
    let base = Utc::now();

    let actors = [ActorId::Scout, ActorId::Analyst, ActorId::Critic, ActorId::Analyst, ActorId::Composer];
    for (n, actor) in actors.into_iter().enumerate() {
        let mut insight = Insight::new(actor, InsightType::Discovery, format!("i{n}"), "summary");
        insight.created_at = base + chrono::Duration::seconds(n as i64);
        store.append_insights(actor, vec![insight]).await.unwrap();
    }
    for (n, (actor, confidence)) in [(ActorId::Composer, 55u8), (ActorId::Generator, 91), (ActorId::Critic, 70)]
        .into_iter()
        .enumerate()
    {
        let s = Suggestion::new(actor, SuggestionType::Style, format!("s{n}"), "d", confidence, Impact::Medium);
        store.append_suggestion(actor, s).await.unwrap();
    }

    let window = studio.notification_window(2, 1).await;
    let titles: Vec<_> = window.insights.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["i4", "i3"]);
    assert_eq!(window.suggestions.len(), 1);
    assert_eq!(window.suggestions[0].title, "s1");

    let all = studio.active_insights().await;
    assert_eq!(all.len(), 5);
    assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    let suggestions = studio.active_suggestions().await;
    assert!(suggestions.windows(2).all(|w| w[0].confidence >= w[1].confidence));
}

#[tokio::test]
async fn test_dismiss_and_apply_flow_through_studio() {
    let studio = studio_with(weak_result());
    studio
        .analyze(ActorId::Analyst, &SubjectPayload::new("img-3", Vec::new()))
        .await
        .unwrap();

    let insight = studio.active_insights().await.remove(0);
    assert!(studio.dismiss_insight(insight.actor_id, &insight.id).await.unwrap());
    assert!(!studio.dismiss_insight(insight.actor_id, &insight.id).await.unwrap());
    assert!(studio.active_insights().await.iter().all(|i| i.id != insight.id));

    let suggestion = studio.active_suggestions().await.remove(0);
    assert!(studio.apply_suggestion(suggestion.actor_id, &suggestion.id).await.unwrap());
    assert!(!studio.dismiss_suggestion(suggestion.actor_id, &suggestion.id).await.unwrap());
    let stored = studio.snapshot(suggestion.actor_id).await.unwrap().suggestions;
    assert!(stored[0].applied && !stored[0].dismissed);
    assert!(studio.active_suggestions().await.is_empty());
}

#[tokio::test]
async fn test_reset_restores_every_actor() {
    let studio = studio_with(weak_result());
    studio
        .analyze(ActorId::Analyst, &SubjectPayload::new("img-5", Vec::new()))
        .await
        .unwrap();
    studio.chat().send_user_message(ActorId::Critic, "review this").await.unwrap();
    studio
        .tasks()
        .start(ActorId::Generator, TaskSpec::new(TaskKind::Generation, "variations"))
        .await
        .unwrap();
    studio.set_enabled(ActorId::Scout, false).await.unwrap();

    studio.reset().await;

    for snap in studio.snapshots().await {
        assert!(snap.insights.is_empty());
        assert!(snap.suggestions.is_empty());
        assert!(snap.chat_history.is_empty());
        assert!(snap.current_task.is_none());
        assert_eq!(snap.status, ActorStatus::Idle);
    }
    assert_eq!(studio.registry().all().len(), 5);
}

#[tokio::test]
async fn test_command_loop_publishes_feed() {
    let studio = studio_with(weak_result());
    let (cmd_tx, mut feed_rx, _events) = spawn_command_loop(studio.clone());

    cmd_tx
        .send(Command::Upload(SubjectPayload::new("img-9", Vec::new())))
        .unwrap();

    let feed = timeout(Duration::from_secs(2), async {
        loop {
            feed_rx.changed().await.unwrap();
            let feed = feed_rx.borrow().clone();
            if !feed.window.suggestions.is_empty() {
                return feed;
            }
        }
    })
    .await
    .unwrap();
    assert!(!feed.window.insights.is_empty());
    assert!(feed.window.insights.len() <= studio.config().feed.max_insights);
    assert_eq!(feed.actors.len(), 5);

    cmd_tx.send(Command::SetMode(AssistantMode::Focused)).unwrap();
    timeout(Duration::from_secs(2), async {
        loop {
            feed_rx.changed().await.unwrap();
            if feed_rx.borrow().mode == AssistantMode::Focused {
                break;
            }
        }
    })
    .await
    .unwrap();

    cmd_tx.send(Command::Quit).unwrap();
}
