// ==========================================
// 音乐学校排课系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、日期窗口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod enrollment;
pub mod occurrence;
pub mod run_log;
pub mod template;
pub mod types;
pub mod window;

// 重导出核心类型
pub use enrollment::Enrollment;
pub use occurrence::{NewOccurrence, Occurrence};
pub use run_log::{GenerationRun, RunStatus, RunTrigger};
pub use template::{RecurrenceTemplate, DEFAULT_DURATION_MINUTES};
pub use types::{ClassFormat, EnrollmentStatus, OccurrenceKind, OccurrenceStatus};
pub use window::DateWindow;
