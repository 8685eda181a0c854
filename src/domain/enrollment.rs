// ==========================================
// 音乐学校排课系统 - 报名领域模型
// ==========================================
// 报名状态由外部报名管理模块维护,
// 进入 suspended / withdrawn 时触发对账引擎取消未来课次
// ==========================================

use crate::domain::types::{ClassFormat, EnrollmentStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// Enrollment - 报名
// ==========================================
// 一名学生在某一乐器/级别上的长期报名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub enrollment_id: i64,                // 报名ID
    pub teacher_id: i64,                   // 任课老师
    pub status: EnrollmentStatus,          // 报名状态
    pub format: ClassFormat,               // 上课形式 (权威来源)
    pub suspended_until: Option<NaiveDate>, // 暂停截止日期 (仅供展示)
}

impl Enrollment {
    /// 创建新的在读报名 (enrollment_id 由仓储插入时分配)
    pub fn new(teacher_id: i64, format: ClassFormat) -> Self {
        Self {
            enrollment_id: 0,
            teacher_id,
            status: EnrollmentStatus::Active,
            format,
            suspended_until: None,
        }
    }

    /// 是否可生成新课次
    pub fn is_active(&self) -> bool {
        self.status == EnrollmentStatus::Active
    }
}
