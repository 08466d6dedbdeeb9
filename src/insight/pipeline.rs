//! 洞察/建议管线：分析任务 -> 分析器 -> 洞察与跨助手建议
//!
//! 写入顺序固定为先追加发起者的洞察、再追加目标助手的建议，
//! 任何同时读取两者的消费方都能看到洞察先于建议。

use std::time::Duration;

use tokio::sync::watch;

use crate::config::AnalysisSection;
use crate::core::error::{Result, StudioError};
use crate::core::store::InstanceStore;
use crate::core::task::{TaskKind, TaskManager, TaskSpec};
use crate::core::{ActorId, AssistantMode};
use crate::insight::provider::AnalysisProvider;
use crate::insight::rules::RuleTable;
use crate::insight::types::{AnalysisResult, Insight, InsightId, InsightType, Suggestion, SuggestionId, SubjectPayload};

/// 一次分析派生出的记录（尚未写入存储）
#[derive(Debug, Clone, Default)]
pub struct DerivedRecords {
    pub insights: Vec<Insight>,
    /// 跨助手建议：(目标助手, 建议)
    pub suggestion: Option<(ActorId, Suggestion)>,
}

/// 已写入存储的记录 ID
#[derive(Debug, Clone, Default)]
pub struct Published {
    pub insight_ids: Vec<InsightId>,
    pub suggestion: Option<(ActorId, SuggestionId)>,
}

/// 纯变换：由分析结果生成 origin 的洞察，以及按规则表生成另一个助手的建议
pub fn derive_insights(
    origin: ActorId,
    result: &AnalysisResult,
    mode: AssistantMode,
    rules: &RuleTable,
) -> DerivedRecords {
    if !mode.emits_insights() {
        return DerivedRecords::default();
    }

    let mut insights = vec![Insight::new(
        origin,
        InsightType::Analysis,
        format!("{} {} analyzed", capitalize(&result.style.primary), result.subject.primary),
        format!(
            "{} composition with a {} palette ({}).",
            capitalize(&result.composition.rule),
            result.colors.harmony,
            result.colors.dominant.join(", ")
        ),
    )
    .with_details(format!(
        "Quality {}/100 · sharpness {} · exposure {} · noise {} · tags: {}",
        result.quality.score,
        result.quality.sharpness,
        result.quality.exposure,
        result.quality.noise,
        result.subject.tags.join(", ")
    ))
    .with_scores(result.style.confidence, 80)
    .with_data(serde_json::to_value(result).unwrap_or_default())
    .with_actions(&["View details", "Compare with previous"])];

    if result.quality.score < 60 {
        insights.push(
            Insight::new(
                origin,
                InsightType::Warning,
                "Quality concerns detected",
                format!(
                    "Overall quality is {}/100; sharpness {} and noise {} may show in prints.",
                    result.quality.score, result.quality.sharpness, result.quality.noise
                ),
            )
            .with_scores(85, 90)
            .with_actions(&["Enhance", "Ignore"]),
        );
    }

    if result.composition.balance < 65 {
        insights.push(
            Insight::new(
                origin,
                InsightType::Tip,
                "Composition feels off-balance",
                format!(
                    "Visual weight balance is {}/100 across {} focal point(s).",
                    result.composition.balance, result.composition.focal_points
                ),
            )
            .with_scores(70, 70),
        );
    }

    if result.colors.saturation >= 75 {
        insights.push(
            Insight::new(
                origin,
                InsightType::Discovery,
                "Vibrant palette",
                format!(
                    "Saturation sits at {}/100; {} harmony carries the image.",
                    result.colors.saturation, result.colors.harmony
                ),
            )
            .with_scores(65, 55),
        );
    }

    let suggestion = if mode.emits_suggestions() {
        rules.dispatch(origin, result)
    } else {
        None
    };

    DerivedRecords { insights, suggestion }
}

fn superseded(actor: ActorId, task_id: &str) -> StudioError {
    tracing::debug!(%actor, task_id, "Analysis superseded, dropping results");
    StudioError::Superseded {
        actor: actor.to_string(),
        task_id: task_id.to_string(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// 管线（无状态，每次调用可重新构建）
pub struct InsightPipeline<'a> {
    store: &'a InstanceStore,
    provider: &'a dyn AnalysisProvider,
    rules: &'a RuleTable,
    mode: watch::Receiver<AssistantMode>,
    settings: &'a AnalysisSection,
}

impl<'a> InsightPipeline<'a> {
    pub fn new(
        store: &'a InstanceStore,
        provider: &'a dyn AnalysisProvider,
        rules: &'a RuleTable,
        mode: watch::Receiver<AssistantMode>,
        settings: &'a AnalysisSection,
    ) -> Self {
        Self {
            store,
            provider,
            rules,
            mode,
            settings,
        }
    }

    /// 分析一份素材：检查点进度 -> 分析器 -> 100 -> 写入洞察与建议 -> 完成任务
    ///
    /// 整个调用期间该助手恰有一个进行中的任务；分析器失败时任务走 fail，不产出任何洞察。
    /// 任务在途中被取代（如 reset）时不再调用分析器或写入，返回 Superseded。
    pub async fn analyze(&self, actor: ActorId, payload: &SubjectPayload) -> Result<AnalysisResult> {
        let tasks = TaskManager::new(self.store);
        let spec = TaskSpec::new(TaskKind::Analysis, format!("Analyzing {}", payload.subject_id));
        let task_id = tasks.start(actor, spec).await?;

        let delay = Duration::from_millis(self.settings.stage_delay_ms);
        for checkpoint in self.settings.sorted_checkpoints() {
            tokio::time::sleep(delay).await;
            if !tasks.update_progress(actor, &task_id, checkpoint).await? {
                return Err(superseded(actor, &task_id));
            }
        }

        let result = match self.provider.provide(payload).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(%actor, provider = self.provider.name(), error = %e, "Analysis provider failed");
                tasks.fail(actor, &task_id, e.clone()).await?;
                return Err(StudioError::Provider(e));
            }
        };

        if !tasks.update_progress(actor, &task_id, 100).await? {
            return Err(superseded(actor, &task_id));
        }
        let Some(published) = self.publish(actor, &task_id, &result).await? else {
            return Err(superseded(actor, &task_id));
        };

        let summary = serde_json::json!({
            "subject_id": result.subject_id,
            "quality": result.quality.score,
            "style": result.style.primary,
        });
        if !tasks.complete(actor, &task_id, Some(summary)).await? {
            return Err(superseded(actor, &task_id));
        }
        tracing::info!(
            %actor,
            subject = %result.subject_id,
            insights = published.insight_ids.len(),
            suggestion = published.suggestion.is_some(),
            "Analysis published"
        );
        Ok(result)
    }

    /// 派生并写入：先洞察，后跨助手建议
    ///
    /// 每次写入都确认 task_id 仍是 origin 的当前任务；已被取代时返回 None，剩余记录不再写入。
    pub async fn publish(
        &self,
        origin: ActorId,
        task_id: &str,
        result: &AnalysisResult,
    ) -> Result<Option<Published>> {
        let mode = *self.mode.borrow();
        let derived = derive_insights(origin, result, mode, self.rules);

        let Some(insight_ids) = self
            .store
            .append_insights_for_task(origin, task_id, derived.insights)
            .await?
        else {
            return Ok(None);
        };
        let mut published = Published {
            insight_ids,
            suggestion: None,
        };
        if let Some((target, suggestion)) = derived.suggestion {
            let Some(id) = self
                .store
                .append_suggestion_for_task(origin, task_id, target, suggestion)
                .await?
            else {
                return Ok(None);
            };
            published.suggestion = Some((target, id));
        }
        Ok(Some(published))
    }

    pub async fn dismiss_insight(&self, actor: ActorId, insight_id: &str) -> Result<bool> {
        self.store.dismiss_insight(actor, insight_id).await
    }

    /// 已是终态的建议再次采纳/忽略为无操作
    pub async fn apply_suggestion(&self, actor: ActorId, suggestion_id: &str) -> Result<bool> {
        self.store.apply_suggestion(actor, suggestion_id).await
    }

    pub async fn dismiss_suggestion(&self, actor: ActorId, suggestion_id: &str) -> Result<bool> {
        self.store.dismiss_suggestion(actor, suggestion_id).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::core::events::StudioEvent;
    use crate::core::{ActorRegistry, ActorStatus};
    use crate::insight::provider::FixedProvider;
    use crate::insight::rules::tests::sample_result;

    struct BrokenProvider;

    #[async_trait]
    impl AnalysisProvider for BrokenProvider {
        async fn provide(&self, _payload: &SubjectPayload) -> std::result::Result<AnalysisResult, String> {
            Err("decoder crashed".to_string())
        }
    }

    fn fast_settings() -> AnalysisSection {
        AnalysisSection {
            checkpoints: vec![75, 25, 50],
            stage_delay_ms: 0,
        }
    }

    #[test]
    fn test_derive_emits_warning_and_tip_for_weak_result() {
        let derived = derive_insights(
            ActorId::Analyst,
            &sample_result(40, 40, 70),
            AssistantMode::Proactive,
            &RuleTable::default(),
        );
        let kinds: Vec<InsightType> = derived.insights.iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![InsightType::Analysis, InsightType::Warning, InsightType::Tip]);
        assert!(derived.insights.iter().all(|i| i.actor_id == ActorId::Analyst));
        let (target, _) = derived.suggestion.unwrap();
        assert_ne!(target, ActorId::Analyst);
    }

    #[test]
    fn test_derive_respects_mode() {
        let result = sample_result(90, 90, 70);
        let rules = RuleTable::default();

        let disabled = derive_insights(ActorId::Analyst, &result, AssistantMode::Disabled, &rules);
        assert!(disabled.insights.is_empty());
        assert!(disabled.suggestion.is_none());

        let passive = derive_insights(ActorId::Analyst, &result, AssistantMode::Passive, &rules);
        assert_eq!(passive.insights.len(), 1);
        assert!(passive.suggestion.is_none());
    }

    #[tokio::test]
    async fn test_analyze_progress_then_insights_then_suggestion() {
        let store = InstanceStore::new(&ActorRegistry::new(), 50);
        let provider = FixedProvider::new(sample_result(90, 50, 70));
        let rules = RuleTable::default();
        let (_mode_tx, mode_rx) = watch::channel(AssistantMode::Proactive);
        let settings = fast_settings();
        let pipeline = InsightPipeline::new(&store, &provider, &rules, mode_rx, &settings);
        let mut rx = store.subscribe();

        let result = pipeline
            .analyze(ActorId::Analyst, &SubjectPayload::new("img-9", vec![0u8; 4]))
            .await
            .unwrap();
        assert_eq!(result.subject_id, "img-9");

        let mut progress = Vec::new();
        let mut order = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            match ev {
                StudioEvent::TaskProgress { progress: p, .. } => progress.push(p),
                StudioEvent::TaskFinished { .. } => order.push("finished"),
                StudioEvent::InsightAdded { .. } => order.push("insight"),
                StudioEvent::SuggestionAdded { suggestion } => {
                    assert_eq!(suggestion.actor_id, ActorId::Composer);
                    order.push("suggestion");
                }
                _ => {}
            }
        }
        assert_eq!(progress, vec![25, 50, 75, 100]);
        // 洞察与建议在任务仍进行时写入，任务结束是最后一步
        assert_eq!(order.first(), Some(&"insight"));
        assert_eq!(order.last(), Some(&"finished"));
        assert_eq!(order[order.len() - 2], "suggestion");
        assert_eq!(order.iter().filter(|o| **o == "suggestion").count(), 1);

        let analyst = store.snapshot(ActorId::Analyst).await.unwrap();
        assert!(analyst.current_task.is_none());
        assert_eq!(analyst.status, ActorStatus::Idle);
        assert!(!analyst.insights.is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_fails_task_without_insights() {
        let store = InstanceStore::new(&ActorRegistry::new(), 50);
        let provider = BrokenProvider;
        let rules = RuleTable::default();
        let (_mode_tx, mode_rx) = watch::channel(AssistantMode::Proactive);
        let settings = fast_settings();
        let pipeline = InsightPipeline::new(&store, &provider, &rules, mode_rx, &settings);

        let err = pipeline
            .analyze(ActorId::Analyst, &SubjectPayload::new("img-1", Vec::new()))
            .await
            .unwrap_err();
        assert_eq!(err, StudioError::Provider("decoder crashed".to_string()));

        let analyst = store.snapshot(ActorId::Analyst).await.unwrap();
        assert_eq!(analyst.status, ActorStatus::Error);
        assert!(analyst.current_task.is_none());
        assert!(analyst.insights.is_empty());
        for snap in store.snapshots().await {
            assert!(snap.suggestions.is_empty());
        }
    }

    #[tokio::test]
    async fn test_publish_skipped_for_stale_task() {
        let store = InstanceStore::new(&ActorRegistry::new(), 50);
        let provider = FixedProvider::new(sample_result(40, 40, 90));
        let rules = RuleTable::default();
        let (_mode_tx, mode_rx) = watch::channel(AssistantMode::Proactive);
        let settings = fast_settings();
        let pipeline = InsightPipeline::new(&store, &provider, &rules, mode_rx, &settings);

        let published = pipeline
            .publish(ActorId::Analyst, "task_gone", &sample_result(40, 40, 90))
            .await
            .unwrap();
        assert!(published.is_none());
        for snap in store.snapshots().await {
            assert!(snap.insights.is_empty());
            assert!(snap.suggestions.is_empty());
        }
    }

    #[tokio::test]
    async fn test_analyze_rejected_while_task_running() {
        let store = InstanceStore::new(&ActorRegistry::new(), 50);
        TaskManager::new(&store)
            .start(ActorId::Analyst, TaskSpec::new(TaskKind::Analysis, "busy"))
            .await
            .unwrap();

        let provider = FixedProvider::new(sample_result(90, 90, 70));
        let rules = RuleTable::default();
        let (_mode_tx, mode_rx) = watch::channel(AssistantMode::Proactive);
        let settings = fast_settings();
        let pipeline = InsightPipeline::new(&store, &provider, &rules, mode_rx, &settings);

        let err = pipeline
            .analyze(ActorId::Analyst, &SubjectPayload::new("img-2", Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::TaskAlreadyRunning { .. }));
        assert!(store.snapshot(ActorId::Analyst).await.unwrap().insights.is_empty());
    }
}
