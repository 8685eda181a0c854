// ==========================================
// 音乐学校排课系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表脚本集中在此，测试与生产共用
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 日期列格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 时间列格式（唯一键的一部分，必须固定格式）
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// 时间戳列格式
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存库并建表（单元测试 / 预览用）
pub fn open_in_memory_with_schema() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// 建表（幂等）
///
/// 课次表上的唯一索引 (enrollment_id, class_date, class_time)
/// 是去重的最终防线：并发生成时依赖它实现原子的“不存在才创建”。
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS enrollment (
            enrollment_id INTEGER PRIMARY KEY AUTOINCREMENT,
            teacher_id INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'active',
            format TEXT NOT NULL DEFAULT 'individual',
            suspended_until TEXT,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_enrollment_status
          ON enrollment(status);

        CREATE TABLE IF NOT EXISTS class_schedule (
            template_id INTEGER PRIMARY KEY AUTOINCREMENT,
            enrollment_id INTEGER NOT NULL,
            teacher_id INTEGER NOT NULL,
            day_of_week TEXT NOT NULL,
            time_of_day TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL DEFAULT 45,
            active INTEGER NOT NULL DEFAULT 1,
            valid_from TEXT NOT NULL,
            valid_until TEXT,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_class_schedule_enrollment
          ON class_schedule(enrollment_id, active);

        CREATE TABLE IF NOT EXISTS class_occurrence (
            occurrence_id INTEGER PRIMARY KEY AUTOINCREMENT,
            enrollment_id INTEGER NOT NULL,
            template_id INTEGER REFERENCES class_schedule(template_id) ON DELETE SET NULL,
            teacher_id INTEGER NOT NULL,
            class_date TEXT NOT NULL,
            class_time TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL DEFAULT 45,
            kind TEXT NOT NULL DEFAULT 'regular',
            status TEXT NOT NULL DEFAULT 'scheduled',
            format TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE UNIQUE INDEX IF NOT EXISTS uq_class_occurrence_slot
          ON class_occurrence(enrollment_id, class_date, class_time);

        CREATE INDEX IF NOT EXISTS idx_class_occurrence_template
          ON class_occurrence(template_id, class_date, status);

        CREATE INDEX IF NOT EXISTS idx_class_occurrence_status
          ON class_occurrence(enrollment_id, class_date, status);

        CREATE TABLE IF NOT EXISTS exclusion_year (
            year INTEGER PRIMARY KEY,
            loaded_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS exclusion_day (
            exclusion_date TEXT PRIMARY KEY,
            year INTEGER NOT NULL,
            name TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_exclusion_day_year
          ON exclusion_day(year);

        CREATE TABLE IF NOT EXISTS generation_run (
            run_id TEXT PRIMARY KEY,
            trigger_type TEXT NOT NULL,
            window_from TEXT NOT NULL,
            window_to TEXT NOT NULL,
            created_count INTEGER NOT NULL DEFAULT 0,
            skipped_count INTEGER NOT NULL DEFAULT 0,
            error_count INTEGER NOT NULL DEFAULT 0,
            calendar_warning_count INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_generation_run_trigger
          ON generation_run(trigger_type, finished_at);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
