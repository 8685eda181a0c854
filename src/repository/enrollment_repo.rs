// ==========================================
// 音乐学校排课系统 - 报名数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::enrollment::Enrollment;
use crate::domain::types::{ClassFormat, EnrollmentStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_date, parse_date_column, parse_enum_column};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = "enrollment_id, teacher_id, status, format, suspended_until";

// ==========================================
// EnrollmentRepository - 报名仓储
// ==========================================
pub struct EnrollmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EnrollmentRepository {
    /// 创建新的报名仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Enrollment> {
        let status: String = row.get(2)?;
        let format: String = row.get(3)?;
        let suspended_until: Option<String> = row.get(4)?;
        Ok(Enrollment {
            enrollment_id: row.get(0)?,
            teacher_id: row.get(1)?,
            status: parse_enum_column(&status, 2, EnrollmentStatus::parse)?,
            format: parse_enum_column(&format, 3, ClassFormat::parse)?,
            suspended_until: suspended_until
                .as_deref()
                .map(|s| parse_date_column(s, 4))
                .transpose()?,
        })
    }

    /// 插入报名，返回新分配的 enrollment_id
    pub fn insert(&self, enrollment: &Enrollment) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO enrollment (teacher_id, status, format, suspended_until)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                enrollment.teacher_id,
                enrollment.status.as_str(),
                enrollment.format.as_str(),
                enrollment.suspended_until.map(format_date),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 按ID查询报名
    pub fn find_by_id(&self, enrollment_id: i64) -> RepositoryResult<Option<Enrollment>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM enrollment WHERE enrollment_id = ?1", SELECT_COLUMNS);
        let enrollment = conn
            .query_row(&sql, params![enrollment_id], Self::map_row)
            .optional()?;
        Ok(enrollment)
    }

    /// 按状态查询报名列表
    pub fn list_by_status(&self, status: EnrollmentStatus) -> RepositoryResult<Vec<Enrollment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM enrollment WHERE status = ?1 ORDER BY enrollment_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![status.as_str()], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// 更新报名状态
    ///
    /// # 返回
    /// - Ok(usize): 受影响行数 (0 表示报名不存在)
    pub fn update_status(
        &self,
        enrollment_id: i64,
        status: EnrollmentStatus,
        suspended_until: Option<NaiveDate>,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE enrollment
            SET status = ?1, suspended_until = ?2, updated_at = datetime('now')
            WHERE enrollment_id = ?3
            "#,
            params![status.as_str(), suspended_until.map(format_date), enrollment_id],
        )?;
        Ok(affected)
    }

    /// 更新上课形式 (已生成课次不受影响)
    pub fn update_format(&self, enrollment_id: i64, format: ClassFormat) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE enrollment SET format = ?1, updated_at = datetime('now') WHERE enrollment_id = ?2",
            params![format.as_str(), enrollment_id],
        )?;
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory_with_schema;

    fn setup() -> EnrollmentRepository {
        let conn = open_in_memory_with_schema().unwrap();
        EnrollmentRepository::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_insert_and_find() {
        let repo = setup();
        let id = repo.insert(&Enrollment::new(7, ClassFormat::Group)).unwrap();

        let found = repo.find_by_id(id).unwrap().unwrap();
        assert_eq!(found.enrollment_id, id);
        assert_eq!(found.teacher_id, 7);
        assert_eq!(found.status, EnrollmentStatus::Active);
        assert_eq!(found.format, ClassFormat::Group);
        assert!(repo.find_by_id(id + 100).unwrap().is_none());
    }

    #[test]
    fn test_list_by_status_and_update() {
        let repo = setup();
        let a = repo.insert(&Enrollment::new(1, ClassFormat::Individual)).unwrap();
        let b = repo.insert(&Enrollment::new(1, ClassFormat::Individual)).unwrap();

        let until = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(repo.update_status(b, EnrollmentStatus::Suspended, Some(until)).unwrap(), 1);

        let active = repo.list_by_status(EnrollmentStatus::Active).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].enrollment_id, a);

        let suspended = repo.find_by_id(b).unwrap().unwrap();
        assert_eq!(suspended.suspended_until, Some(until));
    }
}
