// ==========================================
// 音乐学校排课系统 - 停课日历服务
// ==========================================
// 职责: 回答“某日期是否停课 (节假日)”
// 红线: 纯查询, 无副作用; 数据由外部维护
// 红线: 缺失年份不报错, 视为“无停课日”, 由引擎计入告警
// ==========================================

pub mod holiday_calendar;
pub mod importer;
pub mod seed;

pub use holiday_calendar::HolidayCalendar;
pub use importer::{CalendarImportError, HolidayCsvImporter, ImportReport};
pub use seed::{builtin_holidays, seed_if_empty};

use chrono::NaiveDate;

/// 单个日期的查询结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionLookup {
    /// 停课日
    Excluded,
    /// 正常上课日
    Open,
    /// 该年份没有停课日数据 (按正常上课处理, 需告警)
    YearMissing(i32),
}

impl ExclusionLookup {
    pub fn is_excluded(&self) -> bool {
        matches!(self, ExclusionLookup::Excluded)
    }
}

// ==========================================
// ExclusionCalendar - 停课日历 Trait
// ==========================================
pub trait ExclusionCalendar: Send + Sync {
    /// 查询日期, 区分“数据缺失”与“正常上课”
    fn lookup(&self, date: NaiveDate) -> ExclusionLookup;

    /// 是否停课
    fn is_excluded(&self, date: NaiveDate) -> bool {
        self.lookup(date).is_excluded()
    }
}
