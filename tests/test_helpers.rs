// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、测试数据生成等功能
// ==========================================
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime, Weekday};
use classgen::app::AppState;
use classgen::db::{init_schema, open_sqlite_connection};
use classgen::domain::types::ClassFormat;
use classgen::{
    ClassGenRepositories, Enrollment, ExclusionCalendar, GenerationEngine, GenerationSettings,
    HolidayCalendar, RecurrenceTemplate,
};
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开测试数据库连接（统一 PRAGMA）
pub fn open_test_connection(db_path: &str) -> Result<Arc<Mutex<Connection>>, Box<dyn Error>> {
    Ok(Arc::new(Mutex::new(open_sqlite_connection(db_path)?)))
}

/// 基于临时数据库创建 AppState
pub fn create_test_state() -> (NamedTempFile, AppState) {
    let (temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let state = AppState::new(db_path).expect("Failed to create AppState");
    (temp_file, state)
}

/// 基于临时数据库创建仓储集合
pub fn create_test_repos() -> (NamedTempFile, ClassGenRepositories) {
    let (temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_test_connection(&db_path).expect("Failed to open db");
    (temp_file, ClassGenRepositories::from_connection(conn))
}

/// 用给定日历与默认参数组装生成引擎
pub fn engine_with(repos: &ClassGenRepositories, calendar: impl ExclusionCalendar + 'static) -> GenerationEngine {
    GenerationEngine::new(repos.clone(), Arc::new(calendar), GenerationSettings::default())
}

/// 2025 年已加载、无停课日的日历
pub fn open_calendar_2025() -> HolidayCalendar {
    HolidayCalendar::new().with_year(2025, Vec::<NaiveDate>::new())
}

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// 插入一个 active 报名
pub fn insert_enrollment(repos: &ClassGenRepositories, format: ClassFormat) -> i64 {
    repos
        .enrollment_repo
        .insert(&Enrollment::new(7, format))
        .expect("Failed to insert enrollment")
}

/// 插入每周模板 (无失效日期)
pub fn insert_weekly_template(
    repos: &ClassGenRepositories,
    enrollment_id: i64,
    day: Weekday,
    time: NaiveTime,
    valid_from: NaiveDate,
) -> i64 {
    repos
        .template_repo
        .insert(&RecurrenceTemplate::weekly(enrollment_id, 7, day, time, valid_from))
        .expect("Failed to insert template")
}

/// 某报名已生成课次的日期 (升序)
pub fn class_dates(repos: &ClassGenRepositories, enrollment_id: i64) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = repos
        .occurrence_repo
        .list_by_enrollment(enrollment_id)
        .unwrap()
        .into_iter()
        .map(|o| o.class_date)
        .collect();
    dates.sort();
    dates
}
