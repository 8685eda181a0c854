// ==========================================
// 音乐学校排课系统 - 日期窗口
// ==========================================
// 半开区间 [from, to): from 包含, to 不包含
// ==========================================

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 半开日期窗口 `[from, to)`
///
/// `to <= from` 时视为空窗口, 不产生任何候选日期。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// 月度自动任务窗口: [today, 下下个月1号)
    ///
    /// 即当月剩余天数 + 下个月整月。
    pub fn monthly(today: NaiveDate) -> Self {
        Self::new(today, first_day_of_month_after_next(today))
    }

    /// 新生入学窗口: [valid_from, valid_from + months)
    pub fn onboarding(valid_from: NaiveDate, months: u32) -> Self {
        Self::new(valid_from, add_months_clamped(valid_from, months))
    }

    pub fn is_empty(&self) -> bool {
        self.to <= self.from
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date < self.to
    }

    /// 与另一窗口求交集 (可能为空)
    pub fn intersect(&self, other: &DateWindow) -> DateWindow {
        DateWindow::new(self.from.max(other.from), self.to.min(other.to))
    }

    /// 两个窗口是否有重叠
    pub fn overlaps(&self, other: &DateWindow) -> bool {
        !self.intersect(other).is_empty()
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.from, self.to)
    }
}

/// 下下个月的第一天
///
/// 例: 2025-10-10 → 2025-12-01; 2025-11-30 → 2026-01-01
pub fn first_day_of_month_after_next(date: NaiveDate) -> NaiveDate {
    let (mut year, mut month) = (date.year(), date.month() + 2);
    if month > 12 {
        month -= 12;
        year += 1;
    }
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MAX)
}

/// 月份加法, 月末对齐
///
/// 例: 2025-01-31 + 1 个月 → 2025-02-28
pub fn add_months_clamped(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_monthly_window_covers_rest_of_month_and_next() {
        let w = DateWindow::monthly(d(2025, 10, 10));
        assert_eq!(w.from, d(2025, 10, 10));
        assert_eq!(w.to, d(2025, 12, 1));
    }

    #[test]
    fn test_monthly_window_year_rollover() {
        assert_eq!(DateWindow::monthly(d(2025, 11, 10)).to, d(2026, 1, 1));
        assert_eq!(DateWindow::monthly(d(2025, 12, 10)).to, d(2026, 2, 1));
    }

    #[test]
    fn test_onboarding_window_clamps_month_end() {
        let w = DateWindow::onboarding(d(2025, 12, 31), 2);
        assert_eq!(w.to, d(2026, 2, 28));

        let w = DateWindow::onboarding(d(2025, 10, 20), 2);
        assert_eq!(w.to, d(2025, 12, 20));
    }

    #[test]
    fn test_half_open_contains() {
        let w = DateWindow::new(d(2025, 10, 1), d(2025, 11, 1));
        assert!(w.contains(d(2025, 10, 1)));
        assert!(w.contains(d(2025, 10, 31)));
        assert!(!w.contains(d(2025, 11, 1)));
    }

    #[test]
    fn test_intersect_and_empty() {
        let a = DateWindow::new(d(2025, 10, 1), d(2025, 11, 1));
        let b = DateWindow::new(d(2025, 10, 20), d(2025, 12, 1));
        assert_eq!(a.intersect(&b), DateWindow::new(d(2025, 10, 20), d(2025, 11, 1)));

        let c = DateWindow::new(d(2025, 11, 1), d(2025, 12, 1));
        assert!(a.intersect(&c).is_empty());
        assert!(!a.overlaps(&c));
    }
}
