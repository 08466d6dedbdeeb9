//! 分析器抽象
//!
//! 所有分析后端实现 AnalysisProvider：provide（素材 -> AnalysisResult）。
//! 当前只有模拟实现与固定结果实现，真实的图像分析在此处接入。

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::insight::types::{
    AnalysisResult, ColorSummary, CompositionSummary, QualitySummary, StyleSummary, SubjectPayload,
    SubjectSummary,
};

/// 分析器 trait；失败以字符串返回，由管线写入任务的 error 字段
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn provide(&self, payload: &SubjectPayload) -> Result<AnalysisResult, String>;

    fn name(&self) -> &str {
        "provider"
    }
}

const PALETTE: &[&str] = &[
    "#1f2937", "#f59e0b", "#10b981", "#3b82f6", "#ef4444", "#8b5cf6", "#f3f4f6", "#0ea5e9",
];
const HARMONIES: &[&str] = &["complementary", "analogous", "triadic", "monochromatic", "split-complementary"];
const RULES: &[&str] = &["rule of thirds", "centered", "golden ratio", "leading lines", "symmetry"];
const STYLES: &[&str] = &["photorealistic", "watercolor", "cinematic", "minimalist", "impressionist", "anime"];
const SUBJECTS: &[&str] = &["portrait", "landscape", "cityscape", "still life", "architecture", "wildlife"];
const TAGS: &[&str] = &["outdoor", "warm light", "high contrast", "soft focus", "night", "texture", "motion"];

/// 模拟分析器：返回随机但合理的结果
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedProvider;

impl SimulatedProvider {
    pub fn new() -> Self {
        Self
    }

    fn sample(subject_id: &str) -> AnalysisResult {
        let mut rng = rand::thread_rng();
        let mut pick = |items: &[&str], n: usize| -> Vec<String> {
            items
                .choose_multiple(&mut rng, n)
                .map(|s| s.to_string())
                .collect()
        };
        let dominant = pick(PALETTE, 3);
        let secondary = pick(STYLES, 2);
        let tags = pick(TAGS, 3);

        let sharpness = rng.gen_range(40..=100u8);
        let exposure = rng.gen_range(40..=100u8);
        let noise = rng.gen_range(0..=50u8);
        let score = ((sharpness as u16 + exposure as u16 + (100 - noise) as u16) / 3) as u8;

        AnalysisResult {
            subject_id: subject_id.to_string(),
            colors: ColorSummary {
                dominant,
                harmony: pick_one(&mut rng, HARMONIES),
                saturation: rng.gen_range(20..=100),
            },
            composition: CompositionSummary {
                rule: pick_one(&mut rng, RULES),
                balance: rng.gen_range(30..=100),
                focal_points: rng.gen_range(1..=4),
            },
            style: StyleSummary {
                primary: pick_one(&mut rng, STYLES),
                secondary,
                confidence: rng.gen_range(50..=98),
            },
            quality: QualitySummary {
                sharpness,
                exposure,
                noise,
                score,
            },
            subject: SubjectSummary {
                primary: pick_one(&mut rng, SUBJECTS),
                tags,
            },
        }
    }
}

fn pick_one(rng: &mut impl Rng, items: &[&str]) -> String {
    items.choose(rng).copied().unwrap_or_default().to_string()
}

#[async_trait]
impl AnalysisProvider for SimulatedProvider {
    async fn provide(&self, payload: &SubjectPayload) -> Result<AnalysisResult, String> {
        if payload.subject_id.trim().is_empty() {
            return Err("empty subject id".to_string());
        }
        Ok(Self::sample(&payload.subject_id))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

/// 固定结果分析器：每次返回同一份结果（subject_id 取自输入）
#[derive(Debug, Clone)]
pub struct FixedProvider {
    result: AnalysisResult,
}

impl FixedProvider {
    pub fn new(result: AnalysisResult) -> Self {
        Self { result }
    }
}

#[async_trait]
impl AnalysisProvider for FixedProvider {
    async fn provide(&self, payload: &SubjectPayload) -> Result<AnalysisResult, String> {
        Ok(AnalysisResult {
            subject_id: payload.subject_id.clone(),
            ..self.result.clone()
        })
    }

    fn name(&self) -> &str {
        "fixed"
    }
}
