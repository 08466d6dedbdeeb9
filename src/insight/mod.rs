//! 洞察层：数据类型、分析器抽象、跨助手规则表、洞察/建议管线

pub mod pipeline;
pub mod provider;
pub mod rules;
pub mod types;

pub use pipeline::{derive_insights, DerivedRecords, InsightPipeline, Published};
pub use provider::{AnalysisProvider, FixedProvider, SimulatedProvider};
pub use rules::{default_rules, CrossActorRule, RuleTable};
pub use types::{
    AnalysisResult, ColorSummary, CompositionSummary, Impact, Insight, InsightId, InsightType,
    QualitySummary, StyleSummary, SubjectPayload, SubjectSummary, Suggestion, SuggestionId,
    SuggestionType,
};
