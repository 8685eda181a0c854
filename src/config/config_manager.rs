// ==========================================
// 音乐学校排课系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入
// 存储: config_kv 表 (scope_id = 'global')
// 约定: 配置值解析失败时告警并使用默认值, 不中断任务
// ==========================================

use crate::config::config_reader::ClassGenConfigReader;
use crate::db::open_sqlite_connection;
use crate::engine::GenerationSettings;
use crate::repository::{RepositoryError, RepositoryResult};
use chrono_tz::Tz;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// 配置默认值
// ==========================================
pub mod defaults {
    pub const TIMEZONE: &str = "America/La_Paz";
    pub const MONTHLY_RUN_DAY: u32 = 10;
    pub const MONTHLY_RUN_HOUR: u32 = 2;
    pub const ONBOARDING_MONTHS: u32 = 2;
    pub const MAX_ITEM_RETRIES: u32 = 1;
    pub const BACKFILL_FROM_LAST_RUN: bool = false;
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值 (存在则覆盖)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
            ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')
            "#,
            params![GLOBAL_SCOPE, key, value],
        )?;
        tracing::info!(config_key = key, value, "配置已更新");
        Ok(())
    }

    /// 获取所有 global 配置的快照 (JSON)
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let config_map = stmt
            .query_map(params![GLOBAL_SCOPE], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<BTreeMap<String, String>>>()?;

        serde_json::to_string(&json!(config_map))
            .map_err(|e| RepositoryError::InternalError(e.to_string()))
    }

    /// 读取并解析配置; 不存在或解析失败时返回默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> RepositoryResult<T>
    where
        T: FromStr + std::fmt::Display,
    {
        let raw = match self.get_global_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };
        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default = %default,
                    "配置值格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 由配置组装生成参数
    pub fn generation_settings(&self) -> RepositoryResult<GenerationSettings> {
        Ok(GenerationSettings {
            onboarding_months: self.onboarding_months()?,
            max_item_retries: self.max_item_retries()?,
            backfill_from_last_run: self.backfill_from_last_run()?,
        })
    }
}

// ==========================================
// ClassGenConfigReader Trait 实现
// ==========================================
impl ClassGenConfigReader for ConfigManager {
    fn timezone(&self) -> RepositoryResult<Tz> {
        let raw = self
            .get_global_config_value(config_keys::TIMEZONE)?
            .unwrap_or_else(|| defaults::TIMEZONE.to_string());
        match raw.trim().parse::<Tz>() {
            Ok(tz) => Ok(tz),
            Err(_) => {
                tracing::warn!(
                    config_key = config_keys::TIMEZONE,
                    raw_value = %raw,
                    "时区配置无效，使用默认时区"
                );
                Ok(chrono_tz::America::La_Paz)
            }
        }
    }

    fn monthly_run_day(&self) -> RepositoryResult<u32> {
        let day = self.get_parsed_or_default(config_keys::MONTHLY_RUN_DAY, defaults::MONTHLY_RUN_DAY)?;
        // 29~31 日不是每个月都有
        Ok(day.clamp(1, 28))
    }

    fn monthly_run_hour(&self) -> RepositoryResult<u32> {
        let hour = self.get_parsed_or_default(config_keys::MONTHLY_RUN_HOUR, defaults::MONTHLY_RUN_HOUR)?;
        Ok(hour.min(23))
    }

    fn onboarding_months(&self) -> RepositoryResult<u32> {
        let months = self.get_parsed_or_default(config_keys::ONBOARDING_MONTHS, defaults::ONBOARDING_MONTHS)?;
        Ok(months.max(1))
    }

    fn max_item_retries(&self) -> RepositoryResult<u32> {
        self.get_parsed_or_default(config_keys::MAX_ITEM_RETRIES, defaults::MAX_ITEM_RETRIES)
    }

    fn backfill_from_last_run(&self) -> RepositoryResult<bool> {
        self.get_parsed_or_default(config_keys::BACKFILL_FROM_LAST_RUN, defaults::BACKFILL_FROM_LAST_RUN)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 调度
    pub const TIMEZONE: &str = "timezone";
    pub const MONTHLY_RUN_DAY: &str = "monthly_run_day";
    pub const MONTHLY_RUN_HOUR: &str = "monthly_run_hour";

    // 生成
    pub const ONBOARDING_MONTHS: &str = "onboarding_months";
    pub const MAX_ITEM_RETRIES: &str = "max_item_retries";
    pub const BACKFILL_FROM_LAST_RUN: &str = "backfill_from_last_run";

    pub const ALL: &[&str] = &[
        TIMEZONE,
        MONTHLY_RUN_DAY,
        MONTHLY_RUN_HOUR,
        ONBOARDING_MONTHS,
        MAX_ITEM_RETRIES,
        BACKFILL_FROM_LAST_RUN,
    ];
}
