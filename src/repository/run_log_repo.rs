// ==========================================
// 音乐学校排课系统 - 生成任务运行记录仓储
// ==========================================

use crate::domain::run_log::{GenerationRun, RunStatus, RunTrigger};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_date, format_datetime, parse_date_column, parse_datetime_column, parse_enum_column};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = "run_id, trigger_type, window_from, window_to, created_count, \
     skipped_count, error_count, calendar_warning_count, status, started_at, finished_at";

// ==========================================
// GenerationRunRepository - 运行记录仓储
// ==========================================
pub struct GenerationRunRepository {
    conn: Arc<Mutex<Connection>>,
}

impl GenerationRunRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<GenerationRun> {
        let trigger: String = row.get(1)?;
        let window_from: String = row.get(2)?;
        let window_to: String = row.get(3)?;
        let status: String = row.get(8)?;
        let started_at: String = row.get(9)?;
        let finished_at: String = row.get(10)?;
        Ok(GenerationRun {
            run_id: row.get(0)?,
            trigger: parse_enum_column(&trigger, 1, RunTrigger::parse)?,
            window_from: parse_date_column(&window_from, 2)?,
            window_to: parse_date_column(&window_to, 3)?,
            created: row.get::<_, i64>(4)? as usize,
            skipped: row.get::<_, i64>(5)? as usize,
            errors: row.get::<_, i64>(6)? as usize,
            calendar_warnings: row.get::<_, i64>(7)? as usize,
            status: parse_enum_column(&status, 8, RunStatus::parse)?,
            started_at: parse_datetime_column(&started_at, 9)?,
            finished_at: parse_datetime_column(&finished_at, 10)?,
        })
    }

    /// 写入一条运行记录
    pub fn insert(&self, run: &GenerationRun) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO generation_run (
                run_id, trigger_type, window_from, window_to,
                created_count, skipped_count, error_count, calendar_warning_count,
                status, started_at, finished_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                run.run_id,
                run.trigger.as_str(),
                format_date(run.window_from),
                format_date(run.window_to),
                run.created as i64,
                run.skipped as i64,
                run.errors as i64,
                run.calendar_warnings as i64,
                run.status.as_str(),
                format_datetime(run.started_at),
                format_datetime(run.finished_at),
            ],
        )?;
        Ok(())
    }

    /// 某触发方式下最近一次运行 (按结束时间)
    ///
    /// 带单项错误的运行同样算作“已完成”: 失败项由下一次运行的幂等生成补齐。
    pub fn last_completed(&self, trigger: RunTrigger) -> RepositoryResult<Option<GenerationRun>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM generation_run WHERE trigger_type = ?1 ORDER BY finished_at DESC, rowid DESC LIMIT 1",
            SELECT_COLUMNS
        );
        let run = conn
            .query_row(&sql, params![trigger.as_str()], Self::map_row)
            .optional()?;
        Ok(run)
    }

    /// 最近的运行记录 (最新在前)
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<GenerationRun>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM generation_run ORDER BY finished_at DESC, rowid DESC LIMIT ?1",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![limit as i64], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory_with_schema;
    use chrono::NaiveDate;

    fn run(id: &str, trigger: RunTrigger, finished_day: u32) -> GenerationRun {
        let day = NaiveDate::from_ymd_opt(2025, 10, finished_day).unwrap();
        GenerationRun {
            run_id: id.to_string(),
            trigger,
            window_from: day,
            window_to: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            created: 3,
            skipped: 1,
            errors: 0,
            calendar_warnings: 0,
            status: RunStatus::Completed,
            started_at: day.and_hms_opt(2, 0, 0).unwrap(),
            finished_at: day.and_hms_opt(2, 0, 5).unwrap(),
        }
    }

    #[test]
    fn test_last_completed_by_trigger() {
        let conn = open_in_memory_with_schema().unwrap();
        let repo = GenerationRunRepository::new(Arc::new(Mutex::new(conn)));

        repo.insert(&run("a", RunTrigger::Monthly, 10)).unwrap();
        repo.insert(&run("b", RunTrigger::Monthly, 20)).unwrap();
        repo.insert(&run("c", RunTrigger::Onboarding, 25)).unwrap();

        let last = repo.last_completed(RunTrigger::Monthly).unwrap().unwrap();
        assert_eq!(last.run_id, "b");
        assert_eq!(last.created, 3);
        assert!(repo.last_completed(RunTrigger::Window).unwrap().is_none());

        let recent = repo.list_recent(2).unwrap();
        assert_eq!(recent.iter().map(|r| r.run_id.as_str()).collect::<Vec<_>>(), vec!["c", "b"]);
    }
}
