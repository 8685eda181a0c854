// ==========================================
// 音乐学校排课系统 - 引擎层
// ==========================================
// 职责: 课次展开、生成、对账
// 红线: Engine 不拼 SQL, 所有跳过必须有原因
// ==========================================

pub mod error;
pub mod expander;
pub mod generation;
pub mod policy;
pub mod reconciliation;
pub mod repositories;
pub mod retry;
pub mod summary;

// 重导出核心引擎
pub use error::{EngineError, EngineResult};
pub use expander::{CandidateDates, OccurrenceExpander};
pub use generation::{
    GenerationEngine, GenerationScope, GenerationSettings, PreviewEntry, PreviewReport,
};
pub use policy::{Decision, GenerationPolicy, SkipReason, TemplateEligibility};
pub use reconciliation::{ReconciliationEngine, SupersedeOutcome};
pub use repositories::ClassGenRepositories;
pub use retry::retry_transient;
pub use summary::{GenerationSummary, ItemError, ItemErrorKind, ReconcileSummary};
