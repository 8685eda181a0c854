// ==========================================
// 音乐学校排课系统 - 课表模板数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 例外: insert_exclusive 在同一事务内做重叠检查, 保证检查与写入的原子性
// ==========================================

use crate::domain::template::RecurrenceTemplate;
use crate::domain::types::{parse_weekday, weekday_as_str};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{
    format_date, format_time, parse_date_column, parse_enum_column, parse_time_column,
};
use chrono::{NaiveDate, Weekday};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = "template_id, enrollment_id, teacher_id, day_of_week, time_of_day, \
     duration_minutes, active, valid_from, valid_until";

/// 长期有效模板在重叠比较中使用的上界
const OPEN_ENDED_UNTIL: &str = "9999-12-31";

// ==========================================
// TemplateRepository - 课表模板仓储
// ==========================================
pub struct TemplateRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TemplateRepository {
    /// 创建新的课表模板仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<RecurrenceTemplate> {
        let day: String = row.get(3)?;
        let time: String = row.get(4)?;
        let valid_from: String = row.get(7)?;
        let valid_until: Option<String> = row.get(8)?;
        Ok(RecurrenceTemplate {
            template_id: row.get(0)?,
            enrollment_id: row.get(1)?,
            teacher_id: row.get(2)?,
            day_of_week: parse_enum_column(&day, 3, parse_weekday)?,
            time_of_day: parse_time_column(&time, 4)?,
            duration_minutes: row.get(5)?,
            active: row.get::<_, i64>(6)? != 0,
            valid_from: parse_date_column(&valid_from, 7)?,
            valid_until: valid_until
                .as_deref()
                .map(|s| parse_date_column(s, 8))
                .transpose()?,
        })
    }

    fn insert_with_conn(conn: &Connection, template: &RecurrenceTemplate) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO class_schedule (
                enrollment_id, teacher_id, day_of_week, time_of_day,
                duration_minutes, active, valid_from, valid_until
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                template.enrollment_id,
                template.teacher_id,
                weekday_as_str(template.day_of_week),
                format_time(template.time_of_day),
                template.duration_minutes,
                template.active as i64,
                format_date(template.valid_from),
                template.valid_until.map(format_date),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 插入模板 (不做重叠检查)，返回新分配的 template_id
    pub fn insert(&self, template: &RecurrenceTemplate) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::insert_with_conn(&conn, template)
    }

    /// 插入模板, 拒绝与同一报名、同一星期的启用模板有效期重叠
    ///
    /// 同一报名不同星期的模板 (如每周二、周四各一节) 不受影响。
    ///
    /// # 返回
    /// - Ok(template_id): 插入成功
    /// - Err(BusinessRuleViolation): 存在重叠的启用模板
    pub fn insert_exclusive(&self, template: &RecurrenceTemplate) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        if template.active {
            let conflict = Self::find_overlapping_with_conn(
                &tx,
                template.enrollment_id,
                template.day_of_week,
                template.valid_from,
                template.valid_until,
                None,
            )?;
            if let Some(existing) = conflict {
                return Err(RepositoryError::BusinessRuleViolation(format!(
                    "报名 {} 在 {} 已有生效模板 {} (有效期 {} ~ {})，请先关闭旧模板",
                    template.enrollment_id,
                    weekday_as_str(template.day_of_week),
                    existing.template_id,
                    existing.valid_from,
                    existing
                        .valid_until
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "长期".to_string()),
                )));
            }
        }

        let id = Self::insert_with_conn(&tx, template)?;
        tx.commit()?;
        Ok(id)
    }

    fn find_overlapping_with_conn(
        conn: &Connection,
        enrollment_id: i64,
        day_of_week: Weekday,
        valid_from: NaiveDate,
        valid_until: Option<NaiveDate>,
        exclude_template_id: Option<i64>,
    ) -> RepositoryResult<Option<RecurrenceTemplate>> {
        // [a_from, a_until) 与 [b_from, b_until) 重叠: a_from < b_until AND b_from < a_until
        let sql = format!(
            r#"
            SELECT {} FROM class_schedule
            WHERE enrollment_id = ?1
              AND day_of_week = ?2
              AND active = 1
              AND valid_from < ?3
              AND COALESCE(valid_until, '{}') > ?4
              AND template_id != ?5
            ORDER BY template_id
            LIMIT 1
            "#,
            SELECT_COLUMNS, OPEN_ENDED_UNTIL
        );
        let until = valid_until
            .map(format_date)
            .unwrap_or_else(|| OPEN_ENDED_UNTIL.to_string());
        let existing = conn
            .query_row(
                &sql,
                params![
                    enrollment_id,
                    weekday_as_str(day_of_week),
                    until,
                    format_date(valid_from),
                    exclude_template_id.unwrap_or(-1),
                ],
                Self::map_row,
            )
            .optional()?;
        Ok(existing)
    }

    /// 查询与给定有效期重叠的启用模板
    pub fn find_overlapping_active(
        &self,
        enrollment_id: i64,
        day_of_week: Weekday,
        valid_from: NaiveDate,
        valid_until: Option<NaiveDate>,
        exclude_template_id: Option<i64>,
    ) -> RepositoryResult<Option<RecurrenceTemplate>> {
        let conn = self.get_conn()?;
        Self::find_overlapping_with_conn(
            &conn,
            enrollment_id,
            day_of_week,
            valid_from,
            valid_until,
            exclude_template_id,
        )
    }

    /// 按ID查询模板
    pub fn find_by_id(&self, template_id: i64) -> RepositoryResult<Option<RecurrenceTemplate>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM class_schedule WHERE template_id = ?1", SELECT_COLUMNS);
        let template = conn
            .query_row(&sql, params![template_id], Self::map_row)
            .optional()?;
        Ok(template)
    }

    /// 查询某报名的全部启用模板
    pub fn list_active_by_enrollment(&self, enrollment_id: i64) -> RepositoryResult<Vec<RecurrenceTemplate>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM class_schedule WHERE enrollment_id = ?1 AND active = 1 ORDER BY template_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![enrollment_id], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// 查询全部启用模板
    pub fn list_active(&self) -> RepositoryResult<Vec<RecurrenceTemplate>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM class_schedule WHERE active = 1 ORDER BY enrollment_id, template_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// 关闭模板: 将失效日期收紧到 valid_until (不含)
    ///
    /// 模板在 [valid_from, valid_until) 内仍然有效, 保持 active;
    /// 已有更早的失效日期时保持不变。
    /// 关闭日不晚于 valid_from 时模板不再有任何有效日期, 同时停用。
    ///
    /// # 返回
    /// - Ok(usize): 受影响行数 (0 表示模板不存在)
    pub fn close(&self, template_id: i64, valid_until: NaiveDate) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE class_schedule
            SET valid_until = CASE
                    WHEN valid_until IS NOT NULL AND valid_until < ?1 THEN valid_until
                    ELSE ?1
                END,
                active = CASE WHEN valid_from >= ?1 THEN 0 ELSE active END,
                updated_at = datetime('now')
            WHERE template_id = ?2
            "#,
            params![format_date(valid_until), template_id],
        )?;
        Ok(affected)
    }
}
