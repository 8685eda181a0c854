// ==========================================
// 音乐学校排课系统 - 课次领域模型
// ==========================================
// 课次 (class): 某个具体日期的一节课
// 唯一键: (enrollment_id, class_date, class_time)
// 红线: 上课形式在创建时从报名复制, 之后不随报名修改而变化
// ==========================================

use crate::domain::enrollment::Enrollment;
use crate::domain::template::RecurrenceTemplate;
use crate::domain::types::{ClassFormat, OccurrenceKind, OccurrenceStatus};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Occurrence - 已持久化的课次
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub occurrence_id: i64,          // 课次ID
    pub enrollment_id: i64,          // 所属报名
    pub template_id: Option<i64>,    // 来源模板 (手工创建/模板删除后为空)
    pub teacher_id: i64,             // 任课老师
    pub class_date: NaiveDate,       // 上课日期
    pub class_time: NaiveTime,       // 上课时间
    pub duration_minutes: i32,       // 时长 (分钟)
    pub kind: OccurrenceKind,        // 课次类型
    pub status: OccurrenceStatus,    // 课次状态
    pub format: ClassFormat,         // 上课形式 (创建时快照)
}

// ==========================================
// NewOccurrence - 待创建的课次
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOccurrence {
    pub enrollment_id: i64,
    pub template_id: Option<i64>,
    pub teacher_id: i64,
    pub class_date: NaiveDate,
    pub class_time: NaiveTime,
    pub duration_minutes: i32,
    pub kind: OccurrenceKind,
    pub status: OccurrenceStatus,
    pub format: ClassFormat,
}

impl NewOccurrence {
    /// 由模板生成的常规课次
    ///
    /// 时间/时长/老师取自模板, 上课形式取自报名。
    pub fn regular(enrollment: &Enrollment, template: &RecurrenceTemplate, date: NaiveDate) -> Self {
        Self {
            enrollment_id: enrollment.enrollment_id,
            template_id: Some(template.template_id),
            teacher_id: template.teacher_id,
            class_date: date,
            class_time: template.time_of_day,
            duration_minutes: template.duration_minutes,
            kind: OccurrenceKind::Regular,
            status: OccurrenceStatus::Scheduled,
            format: enrollment.format,
        }
    }
}
