// ==========================================
// 音乐学校排课系统 - 引擎层错误类型
// ==========================================
// 只用于整体失败 (如按需生成时报名不存在);
// 单项失败记入 GenerationSummary.errors, 不走这里
// ==========================================

use crate::repository::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("报名不存在: enrollment_id={0}")]
    EnrollmentNotFound(i64),

    #[error("模板不存在: template_id={0}")]
    TemplateNotFound(i64),

    #[error("报名 {enrollment_id} 状态为 {status}, 不能生成课次")]
    EnrollmentNotActive { enrollment_id: i64, status: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type EngineResult<T> = Result<T, EngineError>;
