// ==========================================
// 音乐学校排课系统 - 月度执行节奏
// ==========================================
// 每月 day 日 hour 点 (学校所在时区) 触发一次
// ==========================================

use crate::config::ClassGenConfigReader;
use crate::repository::RepositoryResult;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlyCadence {
    pub day: u32,  // 1~28
    pub hour: u32, // 0~23
    pub tz: Tz,
}

impl MonthlyCadence {
    pub fn new(day: u32, hour: u32, tz: Tz) -> Self {
        Self {
            day: day.clamp(1, 28),
            hour: hour.min(23),
            tz,
        }
    }

    /// 从配置读取
    pub fn from_config<C: ClassGenConfigReader + ?Sized>(config: &C) -> RepositoryResult<Self> {
        Ok(Self::new(
            config.monthly_run_day()?,
            config.monthly_run_hour()?,
            config.timezone()?,
        ))
    }

    /// 学校时区下的“今天”
    pub fn today_in(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.tz).date_naive()
    }

    /// 严格晚于 now 的下一次触发时刻
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local = now.with_timezone(&self.tz);
        let (mut year, mut month) = (local.year(), local.month());

        // 最多向后看两个月即可找到
        for _ in 0..3 {
            if let Some(candidate) = self.fire_instant(year, month) {
                if candidate > now {
                    return candidate;
                }
            }
            month += 1;
            if month > 12 {
                month = 1;
                year += 1;
            }
        }
        // 不可达: 每个月都存在 1~28 日
        now + Duration::days(28)
    }

    fn fire_instant(&self, year: i32, month: u32) -> Option<DateTime<Utc>> {
        let naive = NaiveDate::from_ymd_opt(year, month, self.day)?.and_hms_opt(self.hour, 0, 0)?;
        let local = self.tz.from_local_datetime(&naive);
        // 夏令时跳变的空档小时顺延一小时
        let resolved = local
            .earliest()
            .or_else(|| self.tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())?;
        Some(resolved.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn la_paz() -> MonthlyCadence {
        MonthlyCadence::new(10, 2, chrono_tz::America::La_Paz)
    }

    #[test]
    fn test_next_fire_same_month() {
        // La Paz = UTC-4, 本地 02:00 = 06:00Z
        let next = la_paz().next_fire_after(utc(2025, 10, 10, 5, 59, 59));
        assert_eq!(next, utc(2025, 10, 10, 6, 0, 0));
    }

    #[test]
    fn test_next_fire_is_strictly_after() {
        let next = la_paz().next_fire_after(utc(2025, 10, 10, 6, 0, 0));
        assert_eq!(next, utc(2025, 11, 10, 6, 0, 0));
    }

    #[test]
    fn test_next_fire_rolls_over_year() {
        let next = la_paz().next_fire_after(utc(2025, 12, 20, 0, 0, 0));
        assert_eq!(next, utc(2026, 1, 10, 6, 0, 0));
    }

    #[test]
    fn test_today_uses_school_timezone() {
        // 2025-11-01 02:00Z 在 La Paz 仍是 10-31
        let today = la_paz().today_in(utc(2025, 11, 1, 2, 0, 0));
        assert_eq!(today, NaiveDate::from_ymd_opt(2025, 10, 31).unwrap());
    }

    #[test]
    fn test_day_is_clamped() {
        let cadence = MonthlyCadence::new(31, 30, chrono_tz::UTC);
        assert_eq!(cadence.day, 28);
        assert_eq!(cadence.hour, 23);
    }
}
