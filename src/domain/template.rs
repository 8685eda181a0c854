// ==========================================
// 音乐学校排课系统 - 课表模板领域模型
// ==========================================
// 课表模板 (schedule): 每周固定时段, 生成具体日期的课次
// 有效期: [valid_from, valid_until), valid_until 为空表示长期有效
// ==========================================

use crate::domain::window::DateWindow;
use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// 未指定时长时的默认课时 (分钟)
pub const DEFAULT_DURATION_MINUTES: i32 = 45;

// ==========================================
// RecurrenceTemplate - 课表模板
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceTemplate {
    pub template_id: i64,                // 模板ID
    pub enrollment_id: i64,              // 所属报名
    pub teacher_id: i64,                 // 任课老师
    pub day_of_week: Weekday,            // 星期
    pub time_of_day: NaiveTime,          // 上课时间
    pub duration_minutes: i32,           // 时长 (分钟)
    pub active: bool,                    // 是否启用
    pub valid_from: NaiveDate,           // 生效日期 (包含)
    pub valid_until: Option<NaiveDate>,  // 失效日期 (不包含)
}

impl RecurrenceTemplate {
    /// 创建长期有效的启用模板 (template_id 由仓储插入时分配)
    pub fn weekly(
        enrollment_id: i64,
        teacher_id: i64,
        day_of_week: Weekday,
        time_of_day: NaiveTime,
        valid_from: NaiveDate,
    ) -> Self {
        Self {
            template_id: 0,
            enrollment_id,
            teacher_id,
            day_of_week,
            time_of_day,
            duration_minutes: DEFAULT_DURATION_MINUTES,
            active: true,
            valid_from,
            valid_until: None,
        }
    }

    pub fn with_valid_until(mut self, valid_until: NaiveDate) -> Self {
        self.valid_until = Some(valid_until);
        self
    }

    pub fn with_duration(mut self, minutes: i32) -> Self {
        self.duration_minutes = minutes;
        self
    }

    /// 有效期是否合法 (valid_until 必须晚于 valid_from)
    pub fn has_valid_window(&self) -> bool {
        match self.valid_until {
            Some(until) => until > self.valid_from,
            None => true,
        }
    }

    /// 有效期窗口; 长期有效时上界为 NaiveDate::MAX
    pub fn validity(&self) -> DateWindow {
        DateWindow::new(self.valid_from, self.valid_until.unwrap_or(NaiveDate::MAX))
    }

    /// 指定日期是否在有效期内
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        self.validity().contains(date)
    }

    /// 有效期是否与窗口有交集
    pub fn intersects(&self, window: &DateWindow) -> bool {
        self.validity().overlaps(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn tuesday_template() -> RecurrenceTemplate {
        RecurrenceTemplate::weekly(
            1,
            1,
            Weekday::Tue,
            NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            d(2025, 11, 1),
        )
    }

    #[test]
    fn test_validity_is_half_open() {
        let t = tuesday_template().with_valid_until(d(2025, 12, 1));
        assert!(!t.is_valid_on(d(2025, 10, 31)));
        assert!(t.is_valid_on(d(2025, 11, 1)));
        assert!(t.is_valid_on(d(2025, 11, 30)));
        assert!(!t.is_valid_on(d(2025, 12, 1)));
    }

    #[test]
    fn test_impossible_window_detected() {
        let t = tuesday_template().with_valid_until(d(2025, 11, 1));
        assert!(!t.has_valid_window());
        let t = tuesday_template().with_valid_until(d(2025, 10, 1));
        assert!(!t.has_valid_window());
        assert!(tuesday_template().has_valid_window());
    }

    #[test]
    fn test_intersects_window() {
        let t = tuesday_template();
        assert!(!t.intersects(&DateWindow::new(d(2025, 10, 1), d(2025, 11, 1))));
        assert!(t.intersects(&DateWindow::new(d(2025, 10, 1), d(2025, 11, 2))));
    }
}
