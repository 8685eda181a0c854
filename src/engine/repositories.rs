// ==========================================
// 音乐学校排课系统 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合生成/对账引擎所需的所有 Repository
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::repository::{
    EnrollmentRepository, ExclusionDayRepository, GenerationRunRepository, OccurrenceRepository,
    TemplateRepository,
};

/// 排课引擎仓储集合
///
/// # 包含的仓储
/// - `enrollment_repo`: 报名
/// - `template_repo`: 课表模板
/// - `occurrence_repo`: 课次
/// - `exclusion_repo`: 停课日
/// - `run_repo`: 生成任务运行记录
#[derive(Clone)]
pub struct ClassGenRepositories {
    pub enrollment_repo: Arc<EnrollmentRepository>,
    pub template_repo: Arc<TemplateRepository>,
    pub occurrence_repo: Arc<OccurrenceRepository>,
    pub exclusion_repo: Arc<ExclusionDayRepository>,
    pub run_repo: Arc<GenerationRunRepository>,
}

impl ClassGenRepositories {
    /// 基于同一个连接创建全部仓储
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            enrollment_repo: Arc::new(EnrollmentRepository::new(conn.clone())),
            template_repo: Arc::new(TemplateRepository::new(conn.clone())),
            occurrence_repo: Arc::new(OccurrenceRepository::new(conn.clone())),
            exclusion_repo: Arc::new(ExclusionDayRepository::new(conn.clone())),
            run_repo: Arc::new(GenerationRunRepository::new(conn)),
        }
    }

    /// 获取报名仓储
    pub fn enrollment_repo(&self) -> &Arc<EnrollmentRepository> {
        &self.enrollment_repo
    }

    /// 获取模板仓储
    pub fn template_repo(&self) -> &Arc<TemplateRepository> {
        &self.template_repo
    }

    /// 获取课次仓储
    pub fn occurrence_repo(&self) -> &Arc<OccurrenceRepository> {
        &self.occurrence_repo
    }

    /// 获取停课日仓储
    pub fn exclusion_repo(&self) -> &Arc<ExclusionDayRepository> {
        &self.exclusion_repo
    }

    /// 获取运行记录仓储
    pub fn run_repo(&self) -> &Arc<GenerationRunRepository> {
        &self.run_repo
    }
}
