//! 洞察、建议与分析结果的数据类型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ActorId;

/// 洞察 ID
pub type InsightId = String;
/// 建议 ID
pub type SuggestionId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    Analysis,
    Suggestion,
    Warning,
    Tip,
    Comparison,
    Discovery,
}

/// 只读发现；除 `dismissed` 外不可变，且 `dismissed` 只能由 false 变为 true
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub id: InsightId,
    pub actor_id: ActorId,
    #[serde(rename = "type")]
    pub kind: InsightType,
    pub title: String,
    pub summary: String,
    pub details: Option<String>,
    /// 0-100
    pub confidence: u8,
    /// 0-100
    pub relevance: u8,
    pub data: Option<serde_json::Value>,
    pub suggested_actions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub dismissed: bool,
    /// 全局写入序号，用于同一时间戳下的稳定排序
    pub seq: u64,
}

impl Insight {
    pub fn new(
        actor_id: ActorId,
        kind: InsightType,
        title: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("insight_{}", uuid::Uuid::new_v4()),
            actor_id,
            kind,
            title: title.into(),
            summary: summary.into(),
            details: None,
            confidence: 50,
            relevance: 50,
            data: None,
            suggested_actions: Vec::new(),
            created_at: Utc::now(),
            dismissed: false,
            seq: 0,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_scores(mut self, confidence: u8, relevance: u8) -> Self {
        self.confidence = confidence.min(100);
        self.relevance = relevance.min(100);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_actions(mut self, actions: &[&str]) -> Self {
        self.suggested_actions = actions.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn is_active(&self) -> bool {
        !self.dismissed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    Composition,
    Color,
    Style,
    Enhancement,
    Variation,
    Review,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Low,
    Medium,
    High,
}

/// 可执行建议；`applied` 与 `dismissed` 互斥，任一为 true 即终态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: SuggestionId,
    pub actor_id: ActorId,
    #[serde(rename = "type")]
    pub kind: SuggestionType,
    pub title: String,
    pub description: String,
    pub preview: Option<String>,
    /// 0-100
    pub confidence: u8,
    pub impact: Impact,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub applied: bool,
    pub dismissed: bool,
    pub seq: u64,
}

impl Suggestion {
    pub fn new(
        actor_id: ActorId,
        kind: SuggestionType,
        title: impl Into<String>,
        description: impl Into<String>,
        confidence: u8,
        impact: Impact,
    ) -> Self {
        Self {
            id: format!("suggestion_{}", uuid::Uuid::new_v4()),
            actor_id,
            kind,
            title: title.into(),
            description: description.into(),
            preview: None,
            confidence: confidence.min(100),
            impact,
            metadata: None,
            created_at: Utc::now(),
            applied: false,
            dismissed: false,
            seq: 0,
        }
    }

    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = Some(preview.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn is_active(&self) -> bool {
        !self.applied && !self.dismissed
    }
}

/// 上传层交给分析器的原始素材
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectPayload {
    pub subject_id: String,
    pub name: Option<String>,
    pub mime_type: Option<String>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl SubjectPayload {
    pub fn new(subject_id: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            subject_id: subject_id.into(),
            name: None,
            mime_type: None,
            bytes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorSummary {
    /// 主色（#RRGGBB）
    pub dominant: Vec<String>,
    pub harmony: String,
    /// 0-100
    pub saturation: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionSummary {
    pub rule: String,
    /// 0-100，越高越平衡
    pub balance: u8,
    pub focal_points: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleSummary {
    pub primary: String,
    pub secondary: Vec<String>,
    pub confidence: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualitySummary {
    pub sharpness: u8,
    pub exposure: u8,
    pub noise: u8,
    /// 综合得分 0-100
    pub score: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectSummary {
    pub primary: String,
    pub tags: Vec<String>,
}

/// 分析器产出的一次性结果；管线消费后即丢弃，不进入存储
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub subject_id: String,
    pub colors: ColorSummary,
    pub composition: CompositionSummary,
    pub style: StyleSummary,
    pub quality: QualitySummary,
    pub subject: SubjectSummary,
}
