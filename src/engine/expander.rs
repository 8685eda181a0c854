// ==========================================
// 音乐学校排课系统 - 课次展开器
// ==========================================
// 职责: 模板 + 窗口 → 候选上课日期 (惰性序列)
// 红线: 纯函数, 无副作用; 生成与预览共用同一展开逻辑
// 红线: 半开区间, valid_until 当天不上课
// ==========================================

use crate::domain::template::RecurrenceTemplate;
use crate::domain::window::DateWindow;
use chrono::{Datelike, Days, NaiveDate, Weekday};

// ==========================================
// CandidateDates - 候选日期迭代器
// ==========================================
/// 有限、惰性、可克隆 (克隆即可从当前位置重新遍历)
#[derive(Debug, Clone)]
pub struct CandidateDates {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl CandidateDates {
    fn empty() -> Self {
        Self {
            next: None,
            end: NaiveDate::MIN,
        }
    }

    /// 窗口内所有落在 weekday 的日期
    pub fn weekly(weekday: Weekday, window: DateWindow) -> Self {
        if window.is_empty() {
            return Self::empty();
        }
        let offset = (7 + weekday.num_days_from_monday() - window.from.weekday().num_days_from_monday()) % 7;
        let first = window.from.checked_add_days(Days::new(u64::from(offset)));
        match first {
            Some(first) if first < window.to => Self {
                next: Some(first),
                end: window.to,
            },
            _ => Self::empty(),
        }
    }
}

impl Iterator for CandidateDates {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next?;
        self.next = current
            .checked_add_days(Days::new(7))
            .filter(|d| *d < self.end);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            Some(next) => {
                let remaining = ((self.end - next).num_days() as usize + 6) / 7;
                (remaining, Some(remaining))
            }
            None => (0, Some(0)),
        }
    }
}

// ==========================================
// OccurrenceExpander - 课次展开器
// ==========================================
pub struct OccurrenceExpander;

impl OccurrenceExpander {
    /// 展开模板在窗口内的候选日期
    ///
    /// 结果 = 窗口 ∩ 模板有效期 中所有与模板星期相同的日期。
    /// 不检查 active 标记与有效期合法性, 由调用方的策略负责。
    pub fn expand(template: &RecurrenceTemplate, window: &DateWindow) -> CandidateDates {
        let effective = window.intersect(&template.validity());
        CandidateDates::weekly(template.day_of_week, effective)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn tuesday_16(valid_from: NaiveDate) -> RecurrenceTemplate {
        RecurrenceTemplate::weekly(1, 1, Weekday::Tue, NaiveTime::from_hms_opt(16, 0, 0).unwrap(), valid_from)
    }

    #[test]
    fn test_expand_tuesdays_in_window() {
        let t = tuesday_16(d(2025, 10, 20));
        let window = DateWindow::new(d(2025, 10, 20), d(2025, 12, 1));
        let dates: Vec<_> = OccurrenceExpander::expand(&t, &window).collect();
        assert_eq!(
            dates,
            vec![
                d(2025, 10, 21),
                d(2025, 10, 28),
                d(2025, 11, 4),
                d(2025, 11, 11),
                d(2025, 11, 18),
                d(2025, 11, 25),
            ]
        );
    }

    #[test]
    fn test_validity_boundaries_are_half_open() {
        let window = DateWindow::new(d(2025, 10, 1), d(2025, 12, 1));

        // valid_from 之前不出现
        let from_nov = tuesday_16(d(2025, 11, 1));
        assert!(OccurrenceExpander::expand(&from_nov, &window).all(|x| x >= d(2025, 11, 1)));

        // valid_until 当天及之后不出现 (2025-11-04 为周二)
        let until_nov4 = tuesday_16(d(2025, 10, 1)).with_valid_until(d(2025, 11, 4));
        let dates: Vec<_> = OccurrenceExpander::expand(&until_nov4, &window).collect();
        assert_eq!(dates.last(), Some(&d(2025, 10, 28)));
    }

    #[test]
    fn test_window_end_is_exclusive() {
        let t = tuesday_16(d(2025, 1, 1));
        // 2025-11-25 为周二, 窗口截止于该日 → 不包含
        let window = DateWindow::new(d(2025, 11, 18), d(2025, 11, 25));
        let dates: Vec<_> = OccurrenceExpander::expand(&t, &window).collect();
        assert_eq!(dates, vec![d(2025, 11, 18)]);
    }

    #[test]
    fn test_empty_window_and_restart() {
        let t = tuesday_16(d(2025, 1, 1));
        let empty = DateWindow::new(d(2025, 12, 1), d(2025, 11, 1));
        assert_eq!(OccurrenceExpander::expand(&t, &empty).count(), 0);

        let window = DateWindow::new(d(2025, 10, 20), d(2025, 12, 1));
        let seq = OccurrenceExpander::expand(&t, &window);
        assert_eq!(seq.size_hint(), (6, Some(6)));
        let again = seq.clone();
        assert_eq!(seq.collect::<Vec<_>>(), again.collect::<Vec<_>>());
    }

    #[test]
    fn test_invalid_validity_yields_nothing() {
        let t = tuesday_16(d(2025, 11, 1)).with_valid_until(d(2025, 10, 1));
        let window = DateWindow::new(d(2025, 1, 1), d(2026, 1, 1));
        assert_eq!(OccurrenceExpander::expand(&t, &window).count(), 0);
    }
}
