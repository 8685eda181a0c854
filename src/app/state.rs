// ==========================================
// 音乐学校排课系统 - 应用状态
// ==========================================
// 职责: 管理进程级共享资源 (连接、仓储、配置), 按需组装引擎
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::calendar::{seed_if_empty, HolidayCalendar};
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::{ClassGenRepositories, GenerationEngine, ReconciliationEngine};
use crate::repository::RepositoryResult;

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 共享连接
    pub conn: Arc<Mutex<Connection>>,

    /// 仓储集合
    pub repos: ClassGenRepositories,

    /// 配置管理器
    pub config: Arc<ConfigManager>,
}

impl AppState {
    /// 打开数据库并建表
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: String) -> RepositoryResult<Self> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let conn = open_sqlite_connection(&db_path)?;
        init_schema(&conn)?;
        let conn = Arc::new(Mutex::new(conn));

        Ok(Self::from_connection(db_path, conn))
    }

    /// 基于已初始化的连接创建 (测试用内存库)
    pub fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> Self {
        let repos = ClassGenRepositories::from_connection(conn.clone());
        let config = Arc::new(ConfigManager::from_connection(conn.clone()));
        Self {
            db_path,
            conn,
            repos,
            config,
        }
    }

    /// 停课日表为空时写入内置节假日
    pub fn seed_holidays(&self) -> RepositoryResult<usize> {
        seed_if_empty(&self.repos.exclusion_repo)
    }

    /// 组装生成引擎 (节假日快照与配置在此刻读取)
    pub fn generation_engine(&self) -> RepositoryResult<GenerationEngine> {
        let calendar = HolidayCalendar::load_all(&self.repos.exclusion_repo)?;
        let settings = self.config.generation_settings()?;
        Ok(GenerationEngine::new(self.repos.clone(), Arc::new(calendar), settings))
    }

    /// 组装对账引擎
    pub fn reconciliation_engine(&self) -> RepositoryResult<ReconciliationEngine> {
        let settings = self.config.generation_settings()?;
        Ok(ReconciliationEngine::new(self.repos.clone(), settings.max_item_retries))
    }
}

/// 默认数据库路径
///
/// 优先级: 环境变量 CLASSGEN_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("CLASSGEN_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./classgen.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        let dir = data_dir.join("music-school-classgen-dev");

        #[cfg(not(debug_assertions))]
        let dir = data_dir.join("music-school-classgen");

        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("classgen.db");
        }
    }

    path.to_string_lossy().to_string()
}
