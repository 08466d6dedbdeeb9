//! 跨助手聚合：从存储按需计算全局排序视图，不持有任何状态

use std::cmp::Reverse;

use crate::core::state::NotificationWindow;
use crate::core::store::InstanceStore;
use crate::insight::{Insight, Suggestion};

#[derive(Clone, Copy)]
pub struct Aggregator<'a> {
    store: &'a InstanceStore,
}

impl<'a> Aggregator<'a> {
    pub fn new(store: &'a InstanceStore) -> Self {
        Self { store }
    }

    /// 所有启用助手的未忽略洞察，按创建时间倒序；同一时间按写入顺序
    pub async fn active_insights(&self) -> Vec<Insight> {
        let mut out: Vec<Insight> = self
            .store
            .snapshots()
            .await
            .into_iter()
            .filter(|inst| inst.enabled)
            .flat_map(|inst| inst.insights.into_iter().filter(|i| i.is_active()))
            .collect();
        out.sort_by_key(|i| (Reverse(i.created_at), i.seq));
        out
    }

    /// 所有启用助手的未采纳、未忽略建议，按置信度倒序；同分按写入顺序
    pub async fn active_suggestions(&self) -> Vec<Suggestion> {
        let mut out: Vec<Suggestion> = self
            .store
            .snapshots()
            .await
            .into_iter()
            .filter(|inst| inst.enabled)
            .flat_map(|inst| inst.suggestions.into_iter().filter(|s| s.is_active()))
            .collect();
        out.sort_by_key(|s| (Reverse(s.confidence), s.seq));
        out
    }

    /// 截取前 max_insights / max_suggestions 条，不修改底层数据
    pub async fn notification_window(&self, max_insights: usize, max_suggestions: usize) -> NotificationWindow {
        let mut insights = self.active_insights().await;
        insights.truncate(max_insights);
        let mut suggestions = self.active_suggestions().await;
        suggestions.truncate(max_suggestions);
        NotificationWindow {
            insights,
            suggestions,
        }
    }
}
