//! Studio 构建器：统一的初始化逻辑
//!
//! 默认使用模拟分析器与内置规则表；测试与真实接入通过 with_provider / with_rules 替换。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::orchestrator::Studio;
use crate::insight::{AnalysisProvider, CrossActorRule, RuleTable, SimulatedProvider};

pub struct StudioBuilder {
    config: AppConfig,
    provider: Option<Arc<dyn AnalysisProvider>>,
    rules: RuleTable,
}

impl StudioBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            provider: None,
            rules: RuleTable::default(),
        }
    }

    /// 替换分析器
    pub fn with_provider(mut self, provider: Arc<dyn AnalysisProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// 替换整张规则表
    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = rules;
        self
    }

    /// 追加一条优先规则
    pub fn with_rule(mut self, rule: CrossActorRule) -> Self {
        self.rules = self.rules.with_rule(rule);
        self
    }

    pub fn build(self) -> Studio {
        let provider = self
            .provider
            .unwrap_or_else(|| Arc::new(SimulatedProvider::new()));
        tracing::info!(
            provider = provider.name(),
            rules = self.rules.len(),
            mode = %self.config.app.mode,
            "Building studio"
        );
        Studio::from_parts(self.config, provider, self.rules)
    }
}
