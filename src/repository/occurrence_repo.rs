// ==========================================
// 音乐学校排课系统 - 课次数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 创建走 INSERT OR IGNORE, 依赖唯一索引实现原子去重
// 红线: 批量删除/取消只作用于 status = 'scheduled' 的课次
// ==========================================

use crate::domain::occurrence::{NewOccurrence, Occurrence};
use crate::domain::types::{ClassFormat, OccurrenceKind, OccurrenceStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{
    format_date, format_time, parse_date_column, parse_enum_column, parse_time_column,
};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = "occurrence_id, enrollment_id, template_id, teacher_id, class_date, \
     class_time, duration_minutes, kind, status, format";

/// “不存在才创建”的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// 新建成功
    Created(i64),
    /// (enrollment, date, time) 已存在课次
    AlreadyExists,
}

// ==========================================
// OccurrenceRepository - 课次仓储
// ==========================================
pub struct OccurrenceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OccurrenceRepository {
    /// 创建新的课次仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Occurrence> {
        let class_date: String = row.get(4)?;
        let class_time: String = row.get(5)?;
        let kind: String = row.get(7)?;
        let status: String = row.get(8)?;
        let format: String = row.get(9)?;
        Ok(Occurrence {
            occurrence_id: row.get(0)?,
            enrollment_id: row.get(1)?,
            template_id: row.get(2)?,
            teacher_id: row.get(3)?,
            class_date: parse_date_column(&class_date, 4)?,
            class_time: parse_time_column(&class_time, 5)?,
            duration_minutes: row.get(6)?,
            kind: parse_enum_column(&kind, 7, OccurrenceKind::parse)?,
            status: parse_enum_column(&status, 8, OccurrenceStatus::parse)?,
            format: parse_enum_column(&format, 9, ClassFormat::parse)?,
        })
    }

    fn execute_insert(conn: &Connection, verb: &str, o: &NewOccurrence) -> rusqlite::Result<usize> {
        let sql = format!(
            r#"
            {} INTO class_occurrence (
                enrollment_id, template_id, teacher_id, class_date, class_time,
                duration_minutes, kind, status, format
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            verb
        );
        conn.execute(
            &sql,
            params![
                o.enrollment_id,
                o.template_id,
                o.teacher_id,
                format_date(o.class_date),
                format_time(o.class_time),
                o.duration_minutes,
                o.kind.as_str(),
                o.status.as_str(),
                o.format.as_str(),
            ],
        )
    }

    /// 原子的“不存在才创建”
    ///
    /// 以 (enrollment_id, class_date, class_time) 唯一索引为准，
    /// 并发调用同一键时只有一个能写入成功。
    pub fn create_if_absent(&self, occurrence: &NewOccurrence) -> RepositoryResult<CreateOutcome> {
        let conn = self.get_conn()?;
        let affected = Self::execute_insert(&conn, "INSERT OR IGNORE", occurrence)?;

        if affected == 0 {
            Ok(CreateOutcome::AlreadyExists)
        } else {
            Ok(CreateOutcome::Created(conn.last_insert_rowid()))
        }
    }

    /// 直接插入课次 (补课/手工课等外部协作方使用)，键冲突时报错
    pub fn insert(&self, occurrence: &NewOccurrence) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::execute_insert(&conn, "INSERT", occurrence)?;
        Ok(conn.last_insert_rowid())
    }

    /// 是否已存在 (enrollment, date, time) 的课次
    pub fn exists(&self, enrollment_id: i64, class_date: NaiveDate, class_time: NaiveTime) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                r#"
                SELECT 1 FROM class_occurrence
                WHERE enrollment_id = ?1 AND class_date = ?2 AND class_time = ?3
                LIMIT 1
                "#,
                params![enrollment_id, format_date(class_date), format_time(class_time)],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(found)
    }

    /// 按ID查询课次
    pub fn find_by_id(&self, occurrence_id: i64) -> RepositoryResult<Option<Occurrence>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM class_occurrence WHERE occurrence_id = ?1", SELECT_COLUMNS);
        let occurrence = conn
            .query_row(&sql, params![occurrence_id], Self::map_row)
            .optional()?;
        Ok(occurrence)
    }

    /// 按报名查询课次 (按日期、时间排序)
    pub fn list_by_enrollment(&self, enrollment_id: i64) -> RepositoryResult<Vec<Occurrence>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM class_occurrence WHERE enrollment_id = ?1 ORDER BY class_date, class_time",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![enrollment_id], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// 按模板查询课次 (按日期排序)
    pub fn list_by_template(&self, template_id: i64) -> RepositoryResult<Vec<Occurrence>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM class_occurrence WHERE template_id = ?1 ORDER BY class_date, class_time",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![template_id], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// 课次总行数
    pub fn count_all(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM class_occurrence", [], |row| row.get(0))?;
        Ok(count)
    }

    /// 更新单个课次状态 (考勤等外部协作方使用)
    pub fn update_status(&self, occurrence_id: i64, status: OccurrenceStatus) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE class_occurrence SET status = ?1, updated_at = datetime('now') WHERE occurrence_id = ?2",
            params![status.as_str(), occurrence_id],
        )?;
        Ok(affected)
    }

    /// 物理删除某模板在 as_of (含) 之后、仍为 scheduled 的课次
    ///
    /// # 返回
    /// - Ok(usize): 删除行数
    pub fn delete_future_scheduled_by_template(&self, template_id: i64, as_of: NaiveDate) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let deleted = conn.execute(
            r#"
            DELETE FROM class_occurrence
            WHERE template_id = ?1
              AND class_date >= ?2
              AND status = ?3
            "#,
            params![template_id, format_date(as_of), OccurrenceStatus::Scheduled.as_str()],
        )?;
        Ok(deleted)
    }

    /// 将某报名在 as_of (含) 之后、仍为 scheduled 的课次改为 cancelled
    ///
    /// 覆盖该报名的全部模板以及手工课次。
    ///
    /// # 返回
    /// - Ok(usize): 更新行数
    pub fn cancel_future_scheduled_by_enrollment(&self, enrollment_id: i64, as_of: NaiveDate) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let cancelled = conn.execute(
            r#"
            UPDATE class_occurrence
            SET status = ?1, updated_at = datetime('now')
            WHERE enrollment_id = ?2
              AND class_date >= ?3
              AND status = ?4
            "#,
            params![
                OccurrenceStatus::Cancelled.as_str(),
                enrollment_id,
                format_date(as_of),
                OccurrenceStatus::Scheduled.as_str(),
            ],
        )?;
        Ok(cancelled)
    }
}
