// ==========================================
// 音乐学校排课系统 - 生成/对账结果汇总
// ==========================================
// 红线: 每次调用都返回结构化计数, 单项失败不抛出整体错误
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 单项错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemErrorKind {
    /// 数据错误: 有效期不合法、报名不存在等 (不重试)
    DataError,
    /// 持久化失败 (已重试)
    Persistence,
}

/// 单项错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub kind: ItemErrorKind,
    pub enrollment_id: i64,
    pub template_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub message: String,
}

impl ItemError {
    pub fn data(enrollment_id: i64, template_id: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            kind: ItemErrorKind::DataError,
            enrollment_id,
            template_id,
            date: None,
            message: message.into(),
        }
    }

    pub fn persistence(
        enrollment_id: i64,
        template_id: Option<i64>,
        date: Option<NaiveDate>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: ItemErrorKind::Persistence,
            enrollment_id,
            template_id,
            date,
            message: message.into(),
        }
    }
}

// ==========================================
// GenerationSummary - 生成结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub created: usize,                 // 新建课次
    pub skipped_duplicate: usize,       // 已存在而跳过
    pub skipped_holiday: usize,         // 停课日跳过
    pub skipped: usize,                 // 跳过合计
    pub enrollments_processed: usize,   // 处理的报名数
    pub templates_processed: usize,     // 处理的模板数
    pub calendar_warnings: usize,       // 缺失节假日数据的年份数
    pub missing_calendar_years: Vec<i32>,
    pub errors: Vec<ItemError>,
}

impl GenerationSummary {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub(crate) fn record_created(&mut self) {
        self.created += 1;
    }

    pub(crate) fn record_duplicate(&mut self) {
        self.skipped_duplicate += 1;
        self.skipped += 1;
    }

    pub(crate) fn record_holiday(&mut self) {
        self.skipped_holiday += 1;
        self.skipped += 1;
    }

    pub(crate) fn record_missing_years(&mut self, years: &BTreeSet<i32>) {
        self.missing_calendar_years = years.iter().copied().collect();
        self.calendar_warnings = years.len();
    }
}

// ==========================================
// ReconcileSummary - 对账结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub deleted: usize,
    pub cancelled: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_counters_add_up() {
        let mut summary = GenerationSummary::default();
        summary.record_created();
        summary.record_holiday();
        summary.record_duplicate();
        summary.record_duplicate();
        summary.record_missing_years(&BTreeSet::from([2027, 2028]));

        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.skipped, summary.skipped_holiday + summary.skipped_duplicate);
        assert_eq!(summary.calendar_warnings, 2);
        assert_eq!(summary.missing_calendar_years, vec![2027, 2028]);
        assert!(!summary.has_errors());
    }
}
