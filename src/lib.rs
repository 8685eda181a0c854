// ==========================================
// 音乐学校排课系统 - 课次生成核心库
// ==========================================
// 技术栈: Rust + SQLite + tokio
// 系统定位: 由课表模板生成具体课次, 处理课表变更与报名状态变更
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 停课日历 - 节假日查询
pub mod calendar;

// 引擎层 - 展开/生成/对账
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 调度层 - 月度定时触发
pub mod scheduler;

// 应用层 - 共享状态组装
pub mod app;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ClassFormat, EnrollmentStatus, OccurrenceKind, OccurrenceStatus};

// 领域实体
pub use domain::{
    DateWindow, Enrollment, GenerationRun, NewOccurrence, Occurrence, RecurrenceTemplate,
    RunStatus, RunTrigger,
};

// 停课日历
pub use calendar::{ExclusionCalendar, ExclusionLookup, HolidayCalendar};

// 引擎
pub use engine::{
    ClassGenRepositories, EngineError, GenerationEngine, GenerationScope, GenerationSettings,
    GenerationSummary, OccurrenceExpander, ReconcileSummary, ReconciliationEngine,
};

// 调度
pub use scheduler::{SchedulerTrigger, TriggerOutcome};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "音乐学校排课系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
