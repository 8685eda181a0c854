// ==========================================
// 音乐学校排课系统 - 应用层
// ==========================================
// 职责: 为守护进程与命令行工具组装共享状态
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
