// ==========================================
// 音乐学校排课系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod enrollment_repo;
pub mod error;
pub mod exclusion_repo;
pub mod occurrence_repo;
pub mod run_log_repo;
pub mod template_repo;

// 重导出核心仓储
pub use enrollment_repo::EnrollmentRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use exclusion_repo::{ExclusionDay, ExclusionDayRepository};
pub use occurrence_repo::{CreateOutcome, OccurrenceRepository};
pub use run_log_repo::GenerationRunRepository;
pub use template_repo::TemplateRepository;

use crate::db::{DATETIME_FORMAT, DATE_FORMAT, TIME_FORMAT};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::Type;

// ==========================================
// 列值解析 (行映射共用)
// ==========================================

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

pub(crate) fn parse_date_column(raw: &str, idx: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| conversion_error(idx, format!("无效日期 '{}': {}", raw, e)))
}

pub(crate) fn parse_time_column(raw: &str, idx: usize) -> rusqlite::Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .map_err(|e| conversion_error(idx, format!("无效时间 '{}': {}", raw, e)))
}

pub(crate) fn parse_datetime_column(raw: &str, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
        .map_err(|e| conversion_error(idx, format!("无效时间戳 '{}': {}", raw, e)))
}

pub(crate) fn parse_enum_column<T>(
    raw: &str,
    idx: usize,
    parse: impl Fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    parse(raw).ok_or_else(|| conversion_error(idx, format!("无效枚举值 '{}'", raw)))
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub(crate) fn format_datetime(ts: NaiveDateTime) -> String {
    ts.format(DATETIME_FORMAT).to_string()
}
