// ==========================================
// 音乐学校排课系统 - 领域类型定义
// ==========================================
// 报名状态 / 上课形式 / 课次类型 / 课次状态 / 星期
// 序列化格式: 小写 (与数据库一致)
// ==========================================

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 报名状态 (Enrollment Status)
// ==========================================
// 红线: 只有 ACTIVE 的报名可以生成新课次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,    // 在读
    Suspended, // 暂停
    Withdrawn, // 退课
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Suspended => "suspended",
            EnrollmentStatus::Withdrawn => "withdrawn",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Some(EnrollmentStatus::Active),
            "suspended" => Some(EnrollmentStatus::Suspended),
            "withdrawn" => Some(EnrollmentStatus::Withdrawn),
            _ => None,
        }
    }

    /// 进入该状态是否需要取消未来课次
    pub fn cancels_future_classes(&self) -> bool {
        matches!(self, EnrollmentStatus::Suspended | EnrollmentStatus::Withdrawn)
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 上课形式 (Class Format)
// ==========================================
// 以报名为准, 生成课次时一次性复制, 之后不再回溯
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassFormat {
    Individual, // 一对一
    Group,      // 小组课
}

impl ClassFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassFormat::Individual => "individual",
            ClassFormat::Group => "group",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "individual" => Some(ClassFormat::Individual),
            "group" => Some(ClassFormat::Group),
            _ => None,
        }
    }
}

impl fmt::Display for ClassFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 课次类型 (Occurrence Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OccurrenceKind {
    Regular,  // 常规课 (由生成引擎创建)
    Recovery, // 补课 (由其他模块创建)
}

impl OccurrenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OccurrenceKind::Regular => "regular",
            OccurrenceKind::Recovery => "recovery",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "regular" => Some(OccurrenceKind::Regular),
            "recovery" => Some(OccurrenceKind::Recovery),
            _ => None,
        }
    }
}

impl fmt::Display for OccurrenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 课次状态 (Occurrence Status)
// ==========================================
// 状态流转: scheduled → completed | cancelled, 不可回退
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OccurrenceStatus {
    Scheduled, // 已排课
    Completed, // 已上课
    Cancelled, // 已取消
}

impl OccurrenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OccurrenceStatus::Scheduled => "scheduled",
            OccurrenceStatus::Completed => "completed",
            OccurrenceStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "scheduled" => Some(OccurrenceStatus::Scheduled),
            "completed" => Some(OccurrenceStatus::Completed),
            "cancelled" => Some(OccurrenceStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for OccurrenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 星期 (存储为小写英文全称)
// ==========================================

pub fn weekday_as_str(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

pub fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.trim().to_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_str() {
        for s in [
            EnrollmentStatus::Active,
            EnrollmentStatus::Suspended,
            EnrollmentStatus::Withdrawn,
        ] {
            assert_eq!(EnrollmentStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(EnrollmentStatus::parse("unknown"), None);
    }

    #[test]
    fn test_cancels_future_classes() {
        assert!(!EnrollmentStatus::Active.cancels_future_classes());
        assert!(EnrollmentStatus::Suspended.cancels_future_classes());
        assert!(EnrollmentStatus::Withdrawn.cancels_future_classes());
    }

    #[test]
    fn test_weekday_names() {
        assert_eq!(parse_weekday("Tuesday"), Some(Weekday::Tue));
        assert_eq!(weekday_as_str(Weekday::Thu), "thursday");
        assert_eq!(parse_weekday("funday"), None);
    }
}
