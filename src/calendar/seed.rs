// ==========================================
// 音乐学校排课系统 - 内置节假日 (玻利维亚)
// ==========================================
// 固定节日: 1/1, 1/22, 5/1, 8/6, 11/2, 12/25
// 浮动节日: 狂欢节 (周一、周二), 耶稣受难日, 基督圣体节, 艾马拉新年 (6/21)
// 每年需人工核对浮动节日, 新年份通过 CSV 导入补充
// ==========================================

use crate::repository::{ExclusionDay, ExclusionDayRepository, RepositoryResult};
use chrono::NaiveDate;
use tracing::info;

const BUILTIN: &[(i32, u32, u32, &str)] = &[
    // 2025
    (2025, 1, 1, "Año Nuevo"),
    (2025, 1, 22, "Estado Plurinacional de Bolivia"),
    (2025, 2, 24, "Lunes de Carnaval"),
    (2025, 2, 25, "Martes de Carnaval"),
    (2025, 4, 18, "Viernes Santo"),
    (2025, 5, 1, "Día del Trabajo"),
    (2025, 6, 19, "Corpus Christi"),
    (2025, 6, 21, "Año Nuevo Aymara"),
    (2025, 8, 6, "Día de la Independencia"),
    (2025, 11, 2, "Todos los Santos"),
    (2025, 12, 25, "Navidad"),
    // 2026
    (2026, 1, 1, "Año Nuevo"),
    (2026, 1, 22, "Estado Plurinacional de Bolivia"),
    (2026, 2, 16, "Lunes de Carnaval"),
    (2026, 2, 17, "Martes de Carnaval"),
    (2026, 4, 3, "Viernes Santo"),
    (2026, 5, 1, "Día del Trabajo"),
    (2026, 6, 21, "Año Nuevo Aymara"),
    (2026, 8, 6, "Día de la Independencia"),
    (2026, 11, 2, "Todos los Santos"),
    (2026, 12, 25, "Navidad"),
];

/// 内置节假日列表
pub fn builtin_holidays() -> Vec<ExclusionDay> {
    BUILTIN
        .iter()
        .filter_map(|&(y, m, d, name)| {
            NaiveDate::from_ymd_opt(y, m, d).map(|date| ExclusionDay::new(date, name))
        })
        .collect()
}

/// 停课日表为空时写入内置节假日
///
/// # 返回
/// - Ok(usize): 写入条数 (表非空时为 0)
pub fn seed_if_empty(repo: &ExclusionDayRepository) -> RepositoryResult<usize> {
    if repo.count()? > 0 {
        return Ok(0);
    }
    let written = repo.insert_batch(&builtin_holidays(), &[])?;
    info!(written, "已写入内置节假日");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory_with_schema;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_seed_only_once() {
        let conn = open_in_memory_with_schema().unwrap();
        let repo = ExclusionDayRepository::new(Arc::new(Mutex::new(conn)));

        let first = seed_if_empty(&repo).unwrap();
        assert_eq!(first, builtin_holidays().len());
        assert_eq!(seed_if_empty(&repo).unwrap(), 0);
        assert_eq!(repo.loaded_years().unwrap(), vec![2025, 2026]);
    }
}
