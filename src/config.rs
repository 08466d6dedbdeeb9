//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `ATELIER__*` 覆盖（双下划线表示嵌套，如 `ATELIER__APP__MODE=passive`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::AssistantMode;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub analysis: AnalysisSection,
    #[serde(default)]
    pub chat: ChatSection,
    #[serde(default)]
    pub feed: FeedSection,
}

/// [app] 段：应用名、全局模式
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
    /// passive / proactive / focused / collaborative / disabled
    #[serde(default)]
    pub mode: AssistantMode,
}

/// [analysis] 段：进度检查点与每段模拟延迟
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSection {
    /// 分析器返回前上报的进度；100 总在分析器返回后单独上报
    #[serde(default = "default_checkpoints")]
    pub checkpoints: Vec<u8>,
    #[serde(default = "default_stage_delay_ms")]
    pub stage_delay_ms: u64,
}

fn default_checkpoints() -> Vec<u8> {
    vec![25, 50, 75]
}

fn default_stage_delay_ms() -> u64 {
    400
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            checkpoints: default_checkpoints(),
            stage_delay_ms: default_stage_delay_ms(),
        }
    }
}

impl AnalysisSection {
    /// 升序、去重，并去掉 >= 100 的值
    pub fn sorted_checkpoints(&self) -> Vec<u8> {
        let mut points: Vec<u8> = self.checkpoints.iter().copied().filter(|p| *p < 100).collect();
        points.sort_unstable();
        points.dedup();
        points
    }
}

/// [chat] 段：思考延迟参数与历史上限
#[derive(Debug, Clone, Deserialize)]
pub struct ChatSection {
    #[serde(default = "default_base_latency_ms")]
    pub base_latency_ms: u64,
    #[serde(default = "default_per_char_ms")]
    pub per_char_ms: u64,
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,
    /// 每个助手保留的消息条数
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_base_latency_ms() -> u64 {
    600
}

fn default_per_char_ms() -> u64 {
    15
}

fn default_jitter_ms() -> u64 {
    400
}

fn default_max_latency_ms() -> u64 {
    2500
}

fn default_history_limit() -> usize {
    200
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            base_latency_ms: default_base_latency_ms(),
            per_char_ms: default_per_char_ms(),
            jitter_ms: default_jitter_ms(),
            max_latency_ms: default_max_latency_ms(),
            history_limit: default_history_limit(),
        }
    }
}

/// [feed] 段：默认通知窗口大小
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSection {
    #[serde(default = "default_max_insights")]
    pub max_insights: usize,
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
}

fn default_max_insights() -> usize {
    3
}

fn default_max_suggestions() -> usize {
    2
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            max_insights: default_max_insights(),
            max_suggestions: default_max_suggestions(),
        }
    }
}

impl AppConfig {
    /// 零延迟配置（测试与脚本化演示用）
    pub fn instant() -> Self {
        Self {
            analysis: AnalysisSection {
                stage_delay_ms: 0,
                ..AnalysisSection::default()
            },
            chat: ChatSection {
                base_latency_ms: 0,
                per_char_ms: 0,
                jitter_ms: 0,
                max_latency_ms: 0,
                ..ChatSection::default()
            },
            ..Self::default()
        }
    }
}

/// 从 config 目录加载配置，环境变量 ATELIER__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 ATELIER__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("ATELIER")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

/// 重新从磁盘与环境变量加载配置
pub fn reload_config() -> Result<AppConfig, config::ConfigError> {
    load_config(None)
}
