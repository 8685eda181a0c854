// ==========================================
// 音乐学校排课系统 - 按年份分区的节假日日历
// ==========================================

use crate::calendar::{ExclusionCalendar, ExclusionLookup};
use crate::repository::{ExclusionDayRepository, RepositoryResult};
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// 内存中的节假日快照
///
/// 每次生成任务开始前从数据库加载一次, 任务期间只读。
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    years: BTreeMap<i32, HashSet<NaiveDate>>,
}

impl HolidayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由日期列表构建, 出现过的年份视为已加载
    pub fn from_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        let mut calendar = Self::new();
        for date in dates {
            calendar.years.entry(date.year()).or_default().insert(date);
        }
        calendar
    }

    /// 登记一个年份 (可以没有任何停课日)
    pub fn with_year(mut self, year: i32, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        let entry = self.years.entry(year).or_default();
        entry.extend(dates.into_iter().filter(|d| d.year() == year));
        self
    }

    /// 从仓储加载全部已登记年份
    pub fn load_all(repo: &ExclusionDayRepository) -> RepositoryResult<Self> {
        let mut calendar = Self::new();
        for year in repo.loaded_years()? {
            let days = repo.list_by_year(year)?;
            calendar = calendar.with_year(year, days.into_iter().map(|d| d.date));
        }
        debug!(years = ?calendar.loaded_years(), "节假日日历加载完成");
        Ok(calendar)
    }

    pub fn loaded_years(&self) -> Vec<i32> {
        self.years.keys().copied().collect()
    }

    pub fn has_year(&self, year: i32) -> bool {
        self.years.contains_key(&year)
    }
}

impl ExclusionCalendar for HolidayCalendar {
    fn lookup(&self, date: NaiveDate) -> ExclusionLookup {
        match self.years.get(&date.year()) {
            Some(days) if days.contains(&date) => ExclusionLookup::Excluded,
            Some(_) => ExclusionLookup::Open,
            None => ExclusionLookup::YearMissing(date.year()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_lookup_distinguishes_missing_year() {
        let calendar = HolidayCalendar::from_dates([d(2025, 11, 11)]);

        assert_eq!(calendar.lookup(d(2025, 11, 11)), ExclusionLookup::Excluded);
        assert_eq!(calendar.lookup(d(2025, 11, 18)), ExclusionLookup::Open);
        assert_eq!(calendar.lookup(d(2027, 1, 1)), ExclusionLookup::YearMissing(2027));
        assert!(!calendar.is_excluded(d(2027, 1, 1)));
    }

    #[test]
    fn test_empty_year_is_loaded() {
        let calendar = HolidayCalendar::new().with_year(2026, Vec::<NaiveDate>::new());
        assert!(calendar.has_year(2026));
        assert_eq!(calendar.lookup(d(2026, 3, 3)), ExclusionLookup::Open);
    }
}
