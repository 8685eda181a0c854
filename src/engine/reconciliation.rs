// ==========================================
// 音乐学校排课系统 - 课次对账引擎
// ==========================================
// 两种触发, 两种处理, 不可合并:
// - 模板被替换 (课表变更): 物理删除旧模板 as_of 之后仍为 scheduled 的课次
// - 报名暂停/退学: 将 as_of 之后仍为 scheduled 的课次改为 cancelled, 保留记录
// 红线: 从不触碰 completed 课次, 从不触碰 as_of 之前的课次
// 红线: 幂等, 重跑只影响剩余的 scheduled 课次
// ==========================================

use crate::domain::template::RecurrenceTemplate;
use crate::domain::types::{weekday_as_str, EnrollmentStatus};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::generation::GenerationEngine;
use crate::engine::repositories::ClassGenRepositories;
use crate::engine::retry::retry_transient;
use crate::engine::summary::{GenerationSummary, ReconcileSummary};
use crate::repository::RepositoryError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// 模板替换结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupersedeOutcome {
    pub closed_template_id: i64,
    pub new_template_id: i64,
    pub deleted: usize,
    pub generation: GenerationSummary,
}

// ==========================================
// ReconciliationEngine - 对账引擎
// ==========================================
pub struct ReconciliationEngine {
    repos: ClassGenRepositories,
    max_item_retries: u32,
}

impl ReconciliationEngine {
    pub fn new(repos: ClassGenRepositories, max_item_retries: u32) -> Self {
        Self {
            repos,
            max_item_retries,
        }
    }

    /// 删除模板在 as_of (含) 之后的 scheduled 课次
    #[instrument(skip(self))]
    pub fn delete_future_occurrences(&self, template_id: i64, as_of: NaiveDate) -> EngineResult<ReconcileSummary> {
        let deleted = retry_transient(self.max_item_retries, "delete_future", || {
            self.repos
                .occurrence_repo
                .delete_future_scheduled_by_template(template_id, as_of)
        })?;
        info!(template_id, %as_of, deleted, "已删除旧模板的未来课次");
        Ok(ReconcileSummary {
            deleted,
            cancelled: 0,
        })
    }

    /// 取消报名在 as_of (含) 之后的 scheduled 课次 (全部模板及手工课次)
    #[instrument(skip(self))]
    pub fn cancel_future_occurrences(&self, enrollment_id: i64, as_of: NaiveDate) -> EngineResult<ReconcileSummary> {
        let cancelled = retry_transient(self.max_item_retries, "cancel_future", || {
            self.repos
                .occurrence_repo
                .cancel_future_scheduled_by_enrollment(enrollment_id, as_of)
        })?;
        info!(enrollment_id, %as_of, cancelled, "已取消报名的未来课次");
        Ok(ReconcileSummary {
            deleted: 0,
            cancelled,
        })
    }

    /// 课表变更: 关闭旧模板 → 删除其未来课次 → 启用新模板 → 为新模板生成课次
    ///
    /// 新模板归属旧模板的报名; valid_from 由调用方给出 (通常等于 as_of)。
    /// 旧模板只收紧 valid_until = as_of, 在 [valid_from, as_of) 内仍参与生成。
    /// 新模板有效期不合法, 或与同一星期的其他启用模板 (含收紧后的旧模板) 重叠时
    /// 返回 BusinessRuleViolation, 此时不做任何写入。
    #[instrument(skip(self, generation, new_template))]
    pub fn supersede_template(
        &self,
        generation: &GenerationEngine,
        old_template_id: i64,
        mut new_template: RecurrenceTemplate,
        as_of: NaiveDate,
    ) -> EngineResult<SupersedeOutcome> {
        let old = retry_transient(self.max_item_retries, "find_template", || {
            self.repos.template_repo.find_by_id(old_template_id)
        })?
        .ok_or(EngineError::TemplateNotFound(old_template_id))?;

        new_template.enrollment_id = old.enrollment_id;
        new_template.active = true;
        self.check_replacement(&old, &new_template, as_of)?;

        retry_transient(self.max_item_retries, "close_template", || {
            self.repos.template_repo.close(old_template_id, as_of)
        })?;
        let deleted = self.delete_future_occurrences(old_template_id, as_of)?.deleted;
        let new_template_id = self.repos.template_repo.insert_exclusive(&new_template)?;

        let summary = generation.generate_for_template(new_template_id)?;
        info!(
            old_template_id,
            new_template_id,
            deleted,
            created = summary.created,
            "课表变更完成"
        );
        Ok(SupersedeOutcome {
            closed_template_id: old_template_id,
            new_template_id,
            deleted,
            generation: summary,
        })
    }

    /// 写入前校验新模板: 有效期合法, 且不与其他启用模板或收紧后的旧模板重叠
    fn check_replacement(
        &self,
        old: &RecurrenceTemplate,
        new_template: &RecurrenceTemplate,
        as_of: NaiveDate,
    ) -> EngineResult<()> {
        if !new_template.has_valid_window() {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "新模板有效期不合法: {} ~ {:?}",
                new_template.valid_from, new_template.valid_until
            ))
            .into());
        }

        let conflict = retry_transient(self.max_item_retries, "find_overlapping", || {
            self.repos.template_repo.find_overlapping_active(
                new_template.enrollment_id,
                new_template.day_of_week,
                new_template.valid_from,
                new_template.valid_until,
                Some(old.template_id),
            )
        })?;
        if let Some(existing) = conflict {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "报名 {} 在 {} 已有生效模板 {}, 与新模板有效期重叠",
                new_template.enrollment_id,
                weekday_as_str(new_template.day_of_week),
                existing.template_id,
            ))
            .into());
        }

        let mut closed = old.clone();
        closed.valid_until = Some(old.valid_until.map_or(as_of, |until| until.min(as_of)));
        if closed.active
            && closed.day_of_week == new_template.day_of_week
            && closed.has_valid_window()
            && closed.validity().overlaps(&new_template.validity())
        {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "新模板自 {} 起生效, 与旧模板 {} 剩余有效期 {} 重叠",
                new_template.valid_from,
                old.template_id,
                closed.validity(),
            ))
            .into());
        }
        Ok(())
    }

    /// 报名状态变更
    ///
    /// 进入 suspended / withdrawn 时取消未来课次; 恢复 active 只改状态,
    /// 课次由下一次月度任务或按需生成补齐。
    #[instrument(skip(self))]
    pub fn apply_status_change(
        &self,
        enrollment_id: i64,
        status: EnrollmentStatus,
        suspended_until: Option<NaiveDate>,
        as_of: NaiveDate,
    ) -> EngineResult<ReconcileSummary> {
        let affected = retry_transient(self.max_item_retries, "update_status", || {
            self.repos
                .enrollment_repo
                .update_status(enrollment_id, status, suspended_until)
        })?;
        if affected == 0 {
            return Err(EngineError::EnrollmentNotFound(enrollment_id));
        }

        if status.cancels_future_classes() {
            self.cancel_future_occurrences(enrollment_id, as_of)
        } else {
            info!(enrollment_id, %status, "报名状态已更新");
            Ok(ReconcileSummary::default())
        }
    }
}
