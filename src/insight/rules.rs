//! 跨助手规则表：分析结果形态 -> (目标助手, 建议构造器)
//!
//! 按顺序匹配，取第一条目标不是发起者的规则；末尾两条兜底规则保证总能产出一条建议。
//! 新规则只需追加到表中，不改动管线分支。

use serde_json::json;

use crate::core::ActorId;
use crate::insight::types::{AnalysisResult, Impact, Suggestion, SuggestionType};

pub struct CrossActorRule {
    pub name: &'static str,
    pub target: ActorId,
    pub applies: fn(&AnalysisResult) -> bool,
    pub build: fn(&AnalysisResult) -> Suggestion,
}

impl std::fmt::Debug for CrossActorRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossActorRule")
            .field("name", &self.name)
            .field("target", &self.target)
            .finish()
    }
}

#[derive(Debug)]
pub struct RuleTable {
    rules: Vec<CrossActorRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<CrossActorRule>) -> Self {
        Self { rules }
    }

    /// 插入到表头，优先于已有规则
    pub fn with_rule(mut self, rule: CrossActorRule) -> Self {
        self.rules.insert(0, rule);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 选出第一条匹配且目标不同于 origin 的规则，生成目标助手的建议
    pub fn dispatch(&self, origin: ActorId, result: &AnalysisResult) -> Option<(ActorId, Suggestion)> {
        let rule = self
            .rules
            .iter()
            .find(|r| r.target != origin && (r.applies)(result))?;
        let mut suggestion = (rule.build)(result).with_metadata(json!({
            "rule": rule.name,
            "source_actor": origin,
            "subject_id": result.subject_id,
        }));
        suggestion.actor_id = rule.target;
        tracing::debug!(rule = rule.name, %origin, target = %rule.target, "Cross-actor rule matched");
        Some((rule.target, suggestion))
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

pub fn default_rules() -> Vec<CrossActorRule> {
    vec![
        CrossActorRule {
            name: "low_quality_regenerate",
            target: ActorId::Generator,
            applies: |r| r.quality.score < 55,
            build: |r| {
                Suggestion::new(
                    ActorId::Generator,
                    SuggestionType::Enhancement,
                    "Regenerate at higher fidelity",
                    format!(
                        "Quality scored {}/100 (sharpness {}, noise {}). A cleaner pass could recover detail.",
                        r.quality.score, r.quality.sharpness, r.quality.noise
                    ),
                    100u8.saturating_sub(r.quality.score).max(50),
                    Impact::High,
                )
            },
        },
        CrossActorRule {
            name: "unbalanced_composition",
            target: ActorId::Composer,
            applies: |r| r.composition.balance < 65,
            build: |r| {
                let impact = if r.composition.balance < 45 {
                    Impact::High
                } else {
                    Impact::Medium
                };
                Suggestion::new(
                    ActorId::Composer,
                    SuggestionType::Composition,
                    "Rebalance the layout",
                    format!(
                        "Balance is {}/100 with {} focal point(s); try shifting the {} toward {}.",
                        r.composition.balance,
                        r.composition.focal_points,
                        r.subject.primary,
                        r.composition.rule
                    ),
                    100 - r.composition.balance.min(100) / 2,
                    impact,
                )
                .with_preview(format!("crop:{}", r.composition.rule))
            },
        },
        CrossActorRule {
            name: "confident_style_variations",
            target: ActorId::Generator,
            applies: |r| r.style.confidence >= 85,
            build: |r| {
                Suggestion::new(
                    ActorId::Generator,
                    SuggestionType::Variation,
                    format!("Explore {} variations", r.style.primary),
                    format!(
                        "The {} style reads clearly ({}% confidence). Generate variations that keep the {} palette.",
                        r.style.primary, r.style.confidence, r.colors.harmony
                    ),
                    r.style.confidence,
                    Impact::Medium,
                )
            },
        },
        CrossActorRule {
            name: "refine_composition",
            target: ActorId::Composer,
            applies: |_| true,
            build: |r| {
                Suggestion::new(
                    ActorId::Composer,
                    SuggestionType::Composition,
                    "Refine framing",
                    format!(
                        "Tighten framing around the {} using the {}.",
                        r.subject.primary, r.composition.rule
                    ),
                    60,
                    Impact::Low,
                )
            },
        },
        CrossActorRule {
            name: "review_before_export",
            target: ActorId::Critic,
            applies: |_| true,
            build: |r| {
                Suggestion::new(
                    ActorId::Critic,
                    SuggestionType::Review,
                    "Review before export",
                    format!(
                        "Run a final review of the {} {} before exporting.",
                        r.style.primary, r.subject.primary
                    ),
                    55,
                    Impact::Low,
                )
            },
        },
    ]
}
