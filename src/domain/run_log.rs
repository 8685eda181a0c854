// ==========================================
// 音乐学校排课系统 - 生成任务运行记录
// ==========================================
// 用途: 审计每次生成任务, 并作为补生成的水位线
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 生成任务的触发方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunTrigger {
    Monthly,    // 月度任务 (定时或手工补跑)
    Onboarding, // 新生入学 / 新模板
    Window,     // 指定窗口的手工生成
}

impl RunTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunTrigger::Monthly => "MONTHLY",
            RunTrigger::Onboarding => "ONBOARDING",
            RunTrigger::Window => "WINDOW",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MONTHLY" => Some(RunTrigger::Monthly),
            "ONBOARDING" => Some(RunTrigger::Onboarding),
            "WINDOW" => Some(RunTrigger::Window),
            _ => None,
        }
    }
}

impl fmt::Display for RunTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 运行结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Completed,           // 全部成功
    CompletedWithErrors, // 完成, 但有单项错误
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "COMPLETED",
            RunStatus::CompletedWithErrors => "COMPLETED_WITH_ERRORS",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "COMPLETED" => Some(RunStatus::Completed),
            "COMPLETED_WITH_ERRORS" => Some(RunStatus::CompletedWithErrors),
            _ => None,
        }
    }
}

// ==========================================
// GenerationRun - 生成任务运行记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRun {
    pub run_id: String,                // 运行ID (uuid)
    pub trigger: RunTrigger,           // 触发方式
    pub window_from: NaiveDate,        // 窗口起始 (包含)
    pub window_to: NaiveDate,          // 窗口截止 (不包含)
    pub created: usize,                // 新建课次数
    pub skipped: usize,                // 跳过数 (重复 + 节假日)
    pub errors: usize,                 // 单项错误数
    pub calendar_warnings: usize,      // 节假日数据缺失告警数
    pub status: RunStatus,             // 运行状态
    pub started_at: NaiveDateTime,     // 开始时间
    pub finished_at: NaiveDateTime,    // 结束时间
}
