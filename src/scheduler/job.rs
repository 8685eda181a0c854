// ==========================================
// 音乐学校排课系统 - 定时任务
// ==========================================
// 生成引擎是同步的 (rusqlite), 在 spawn_blocking 中执行
// 每次运行重新加载节假日快照与配置
// ==========================================

use crate::calendar::HolidayCalendar;
use crate::config::ConfigManager;
use crate::engine::{ClassGenRepositories, EngineError, GenerationEngine, GenerationSummary};
use crate::repository::RepositoryError;
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// 任务整体失败
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("任务线程异常退出: {0}")]
    Join(String),
}

// ==========================================
// ScheduledJob Trait
// ==========================================
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn name(&self) -> &str;

    /// 以学校时区的“今天”执行一次
    async fn run(&self, today: NaiveDate) -> Result<GenerationSummary, JobError>;
}

// ==========================================
// MonthlyGenerationJob - 月度课次生成
// ==========================================
pub struct MonthlyGenerationJob {
    conn: Arc<Mutex<Connection>>,
}

impl MonthlyGenerationJob {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn run_blocking(conn: Arc<Mutex<Connection>>, today: NaiveDate) -> Result<GenerationSummary, JobError> {
        let repos = ClassGenRepositories::from_connection(conn.clone());
        let calendar = HolidayCalendar::load_all(&repos.exclusion_repo)?;
        let settings = ConfigManager::from_connection(conn).generation_settings()?;

        let engine = GenerationEngine::new(repos, Arc::new(calendar), settings);
        Ok(engine.run_monthly(today)?)
    }
}

#[async_trait]
impl ScheduledJob for MonthlyGenerationJob {
    fn name(&self) -> &str {
        "monthly_class_generation"
    }

    async fn run(&self, today: NaiveDate) -> Result<GenerationSummary, JobError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || Self::run_blocking(conn, today))
            .await
            .map_err(|e| JobError::Join(e.to_string()))?
    }
}
