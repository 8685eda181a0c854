// ==========================================
// 音乐学校排课系统 - 节假日 CSV 导入
// ==========================================
// 文件格式: 表头 date,name
// - date: YYYY-MM-DD
// - name: 可选, 节日名称
// 文件中出现的年份整体登记为“已加载”
// ==========================================

use crate::repository::{ExclusionDay, ExclusionDayRepository, RepositoryError};
use chrono::{Datelike, NaiveDate};
use csv::ReaderBuilder;
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// 节假日导入错误
#[derive(Error, Debug)]
pub enum CalendarImportError {
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("缺少必需列: {0}")]
    MissingColumn(String),

    #[error("日期格式错误 (行 {row}): 期望 YYYY-MM-DD，实际 {value}")]
    DateFormatError { row: usize, value: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<std::io::Error> for CalendarImportError {
    fn from(err: std::io::Error) -> Self {
        CalendarImportError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for CalendarImportError {
    fn from(err: csv::Error) -> Self {
        CalendarImportError::CsvParseError(err.to_string())
    }
}

/// 导入结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub rows_read: usize,
    pub imported: usize,
    pub blank_rows: usize,
    pub years: Vec<i32>,
}

// ==========================================
// HolidayCsvImporter
// ==========================================
pub struct HolidayCsvImporter;

impl HolidayCsvImporter {
    /// 解析 CSV 内容为停课日列表 (不落库)
    ///
    /// 任一行日期不合法时整体失败, 避免导入半年份数据。
    pub fn parse<R: Read>(reader: R) -> Result<Vec<ExclusionDay>, CalendarImportError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let date_idx = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case("date"))
            .ok_or_else(|| CalendarImportError::MissingColumn("date".to_string()))?;
        let name_idx = headers.iter().position(|h| h.eq_ignore_ascii_case("name"));

        let mut days = Vec::new();
        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;
            // 表头为第 1 行
            let row = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(row_idx + 2);

            let raw_date = record.get(date_idx).unwrap_or("");
            if raw_date.is_empty() {
                continue;
            }
            let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|_| {
                CalendarImportError::DateFormatError {
                    row,
                    value: raw_date.to_string(),
                }
            })?;
            let name = name_idx
                .and_then(|i| record.get(i))
                .filter(|s| !s.is_empty())
                .map(str::to_string);

            days.push(ExclusionDay { date, name });
        }

        Ok(days)
    }

    /// 从文件导入到仓储
    pub fn import_file(
        path: &Path,
        repo: &ExclusionDayRepository,
    ) -> Result<ImportReport, CalendarImportError> {
        if !path.exists() {
            return Err(CalendarImportError::FileNotFound(path.display().to_string()));
        }
        let file = std::fs::File::open(path)?;
        Self::import_reader(file, repo)
    }

    /// 从任意 reader 导入到仓储 (单事务)
    pub fn import_reader<R: Read>(
        mut reader: R,
        repo: &ExclusionDayRepository,
    ) -> Result<ImportReport, CalendarImportError> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;

        let total_rows = raw.lines().skip(1).count();
        let days = Self::parse(raw.as_bytes())?;
        let years: BTreeSet<i32> = days.iter().map(|d| d.date.year()).collect();

        let imported = repo.insert_batch(&days, &[])?;
        let report = ImportReport {
            rows_read: total_rows,
            imported,
            blank_rows: total_rows.saturating_sub(days.len()),
            years: years.into_iter().collect(),
        };

        info!(
            imported = report.imported,
            blank_rows = report.blank_rows,
            years = ?report.years,
            "节假日导入完成"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "date,name\n2025-11-02,Todos Santos\n\n2025-12-25,Navidad\n2026-01-01,\n";

    #[test]
    fn test_parse_skips_blank_and_keeps_optional_name() {
        let days = HolidayCsvImporter::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].name.as_deref(), Some("Todos Santos"));
        assert_eq!(days[2].name, None);
    }

    #[test]
    fn test_parse_rejects_bad_date_with_row_number() {
        let err = HolidayCsvImporter::parse("date,name\n2025-11-02,ok\n02/11/2025,bad\n".as_bytes())
            .unwrap_err();
        match err {
            CalendarImportError::DateFormatError { row, value } => {
                assert_eq!(row, 3);
                assert_eq!(value, "02/11/2025");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_date_column() {
        let err = HolidayCsvImporter::parse("day,name\n2025-11-02,x\n".as_bytes()).unwrap_err();
        assert!(matches!(err, CalendarImportError::MissingColumn(_)));
    }
}
