// ==========================================
// 音乐学校排课系统 - 生成准入策略
// ==========================================
// 判定顺序:
// 1. 报名状态必须为 active
// 2. 模板 active 且有效期合法, 且与窗口有交集
// 3. 停课日跳过
// 4. 已存在 (enrollment, date, time) 跳过
// 红线: 所有跳过都要有明确原因
// ==========================================

use crate::calendar::{ExclusionCalendar, ExclusionLookup};
use crate::domain::enrollment::Enrollment;
use crate::domain::template::RecurrenceTemplate;
use crate::domain::window::DateWindow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 跳过原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    Holiday,
    Duplicate,
}

/// 单个候选日期的判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Create,
    Skip(SkipReason),
}

/// 模板级别的判定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateEligibility {
    /// 参与生成
    Eligible,
    /// 不参与, 非错误 (停用 / 与窗口无交集)
    Ignored,
    /// 数据错误, 计入错误并跳过
    Invalid(String),
}

pub struct GenerationPolicy;

impl GenerationPolicy {
    /// 报名是否参与生成
    pub fn enrollment_eligible(enrollment: &Enrollment) -> bool {
        enrollment.is_active()
    }

    /// 模板是否参与生成
    pub fn template_eligibility(template: &RecurrenceTemplate, window: &DateWindow) -> TemplateEligibility {
        if !template.active {
            return TemplateEligibility::Ignored;
        }
        if !template.has_valid_window() {
            return TemplateEligibility::Invalid(format!(
                "模板 {} 有效期不合法: valid_until({}) <= valid_from({})",
                template.template_id,
                template
                    .valid_until
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                template.valid_from,
            ));
        }
        if !template.intersects(window) {
            return TemplateEligibility::Ignored;
        }
        TemplateEligibility::Eligible
    }

    /// 候选日期的停课判定
    ///
    /// 缺失年份按“不停课”处理, 年份记入 missing_years。
    pub fn calendar_decision(
        calendar: &dyn ExclusionCalendar,
        date: NaiveDate,
        missing_years: &mut BTreeSet<i32>,
    ) -> Option<SkipReason> {
        match calendar.lookup(date) {
            ExclusionLookup::Excluded => Some(SkipReason::Holiday),
            ExclusionLookup::Open => None,
            ExclusionLookup::YearMissing(year) => {
                missing_years.insert(year);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::HolidayCalendar;
    use crate::domain::types::{ClassFormat, EnrollmentStatus};
    use chrono::{NaiveTime, Weekday};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn template() -> RecurrenceTemplate {
        RecurrenceTemplate::weekly(1, 1, Weekday::Tue, NaiveTime::from_hms_opt(16, 0, 0).unwrap(), d(2025, 10, 20))
    }

    #[test]
    fn test_only_active_enrollments_are_eligible() {
        let mut e = Enrollment::new(1, ClassFormat::Individual);
        assert!(GenerationPolicy::enrollment_eligible(&e));
        e.status = EnrollmentStatus::Suspended;
        assert!(!GenerationPolicy::enrollment_eligible(&e));
        e.status = EnrollmentStatus::Withdrawn;
        assert!(!GenerationPolicy::enrollment_eligible(&e));
    }

    #[test]
    fn test_template_eligibility() {
        let window = DateWindow::new(d(2025, 10, 20), d(2025, 12, 1));
        assert_eq!(GenerationPolicy::template_eligibility(&template(), &window), TemplateEligibility::Eligible);

        let mut inactive = template();
        inactive.active = false;
        assert_eq!(GenerationPolicy::template_eligibility(&inactive, &window), TemplateEligibility::Ignored);

        let later = DateWindow::new(d(2025, 1, 1), d(2025, 2, 1));
        assert_eq!(GenerationPolicy::template_eligibility(&template(), &later), TemplateEligibility::Ignored);

        let broken = template().with_valid_until(d(2025, 10, 20));
        assert!(matches!(
            GenerationPolicy::template_eligibility(&broken, &window),
            TemplateEligibility::Invalid(_)
        ));
    }

    #[test]
    fn test_calendar_decision_tracks_missing_years() {
        let calendar = HolidayCalendar::from_dates([d(2025, 11, 11)]);
        let mut missing = BTreeSet::new();

        assert_eq!(
            GenerationPolicy::calendar_decision(&calendar, d(2025, 11, 11), &mut missing),
            Some(SkipReason::Holiday)
        );
        assert_eq!(GenerationPolicy::calendar_decision(&calendar, d(2026, 1, 6), &mut missing), None);
        assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec![2026]);
    }
}
