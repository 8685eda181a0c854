// ==========================================
// 音乐学校排课系统 - 停课日 (节假日) 数据仓储
// ==========================================
// exclusion_year: 已加载的年份 (年份存在即视为该年数据完整)
// exclusion_day:  具体停课日期
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_date, parse_date_column};
use chrono::{Datelike, NaiveDate};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

/// 一条停课日记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionDay {
    pub date: NaiveDate,
    pub name: Option<String>,
}

impl ExclusionDay {
    pub fn new(date: NaiveDate, name: impl Into<String>) -> Self {
        Self {
            date,
            name: Some(name.into()),
        }
    }
}

// ==========================================
// ExclusionDayRepository - 停课日仓储
// ==========================================
pub struct ExclusionDayRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ExclusionDayRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入单个停课日 (同一日期重复插入时更新名称)
    ///
    /// 该日期所在年份会被登记为已加载。
    pub fn insert(&self, day: &ExclusionDay) -> RepositoryResult<()> {
        self.insert_batch(std::slice::from_ref(day), &[])
            .map(|_| ())
    }

    /// 批量导入停课日 (单事务)
    ///
    /// # 参数
    /// - days: 停课日列表
    /// - extra_years: 额外登记为“已加载”的年份 (该年确实没有停课日时使用)
    ///
    /// # 返回
    /// - Ok(usize): 写入的停课日条数
    pub fn insert_batch(&self, days: &[ExclusionDay], extra_years: &[i32]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut written = 0usize;
        {
            let mut day_stmt = tx.prepare(
                r#"
                INSERT INTO exclusion_day (exclusion_date, year, name)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(exclusion_date) DO UPDATE SET name = excluded.name
                "#,
            )?;
            let mut year_stmt = tx.prepare("INSERT OR IGNORE INTO exclusion_year (year) VALUES (?1)")?;

            for day in days {
                written += day_stmt.execute(params![format_date(day.date), day.date.year(), day.name])?;
                year_stmt.execute(params![day.date.year()])?;
            }
            for year in extra_years {
                year_stmt.execute(params![year])?;
            }
        }

        tx.commit()?;
        Ok(written)
    }

    /// 查询某年的全部停课日 (按日期排序)
    pub fn list_by_year(&self, year: i32) -> RepositoryResult<Vec<ExclusionDay>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT exclusion_date, name FROM exclusion_day WHERE year = ?1 ORDER BY exclusion_date",
        )?;
        let rows = stmt
            .query_map(params![year], |row| {
                let raw: String = row.get(0)?;
                Ok(ExclusionDay {
                    date: parse_date_column(&raw, 0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// 已加载的年份 (升序)
    pub fn loaded_years(&self) -> RepositoryResult<Vec<i32>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT year FROM exclusion_year ORDER BY year")?;
        let years = stmt
            .query_map([], |row| row.get::<_, i32>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(years)
    }

    /// 停课日总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM exclusion_day", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory_with_schema;

    fn setup() -> ExclusionDayRepository {
        let conn = open_in_memory_with_schema().unwrap();
        ExclusionDayRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_batch_registers_years() {
        let repo = setup();
        let days = vec![
            ExclusionDay::new(d(2025, 11, 2), "Todos Santos"),
            ExclusionDay::new(d(2025, 12, 25), "Navidad"),
        ];
        assert_eq!(repo.insert_batch(&days, &[2027]).unwrap(), 2);

        assert_eq!(repo.loaded_years().unwrap(), vec![2025, 2027]);
        assert_eq!(repo.list_by_year(2025).unwrap().len(), 2);
        assert!(repo.list_by_year(2027).unwrap().is_empty());
    }

    #[test]
    fn test_reinsert_same_date_updates_name() {
        let repo = setup();
        repo.insert(&ExclusionDay::new(d(2025, 8, 6), "Independencia")).unwrap();
        repo.insert(&ExclusionDay::new(d(2025, 8, 6), "Día de la Independencia")).unwrap();

        assert_eq!(repo.count().unwrap(), 1);
        let days = repo.list_by_year(2025).unwrap();
        assert_eq!(days[0].name.as_deref(), Some("Día de la Independencia"));
    }
}
