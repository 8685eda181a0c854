// ==========================================
// 音乐学校排课系统 - 课次生成引擎
// ==========================================
// 职责: 模板 → 课次, 按窗口批量生成
// 输入: 报名 + 课表模板 + 停课日历 + 日期窗口
// 输出: GenerationSummary (created / skipped / errors)
// ==========================================
// 红线: 仅 active 报名参与生成
// 红线: 上课形式在创建时从报名复制
// 红线: 创建走原子“不存在才创建”, 重跑只增加 skipped
// 红线: 单个报名/模板/日期失败不影响其他项, 整次运行不因单项失败中止
// ==========================================

use crate::calendar::ExclusionCalendar;
use crate::domain::enrollment::Enrollment;
use crate::domain::occurrence::NewOccurrence;
use crate::domain::run_log::{GenerationRun, RunStatus, RunTrigger};
use crate::domain::template::RecurrenceTemplate;
use crate::domain::types::EnrollmentStatus;
use crate::domain::window::DateWindow;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::expander::OccurrenceExpander;
use crate::engine::policy::{Decision, GenerationPolicy, SkipReason, TemplateEligibility};
use crate::engine::repositories::ClassGenRepositories;
use crate::engine::retry::retry_transient;
use crate::engine::summary::{GenerationSummary, ItemError};
use crate::repository::CreateOutcome;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// GenerationSettings - 生成参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSettings {
    pub onboarding_months: u32,       // 新生入学窗口月数: 2
    pub max_item_retries: u32,        // 单项瞬时失败重试次数: 1
    pub backfill_from_last_run: bool, // 月度任务是否从上次窗口末尾补生成: false
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            onboarding_months: 2,
            max_item_retries: 1,
            backfill_from_last_run: false,
        }
    }
}

/// 生成范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationScope {
    /// 全部 active 报名 (月度任务)
    AllActive,
    /// 单个报名 (入学/手工)
    Enrollment(i64),
}

/// 预览中的单条判定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewEntry {
    pub enrollment_id: i64,
    pub template_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub decision: Decision,
}

/// 预览结果: 判定明细 + 假设执行时的计数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewReport {
    pub entries: Vec<PreviewEntry>,
    pub summary: GenerationSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Persist,
    DryRun,
}

/// 单次运行的累积状态
struct RunContext {
    mode: Mode,
    summary: GenerationSummary,
    missing_years: BTreeSet<i32>,
    entries: Vec<PreviewEntry>,
}

impl RunContext {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            summary: GenerationSummary::default(),
            missing_years: BTreeSet::new(),
            entries: Vec::new(),
        }
    }

    fn finish(mut self) -> (GenerationSummary, Vec<PreviewEntry>) {
        for year in &self.missing_years {
            warn!(year, "节假日数据缺失, 该年份按无停课日处理");
        }
        self.summary.record_missing_years(&self.missing_years);
        (self.summary, self.entries)
    }
}

// ==========================================
// GenerationEngine - 课次生成引擎
// ==========================================
pub struct GenerationEngine {
    repos: ClassGenRepositories,
    calendar: Arc<dyn ExclusionCalendar>,
    settings: GenerationSettings,
}

impl GenerationEngine {
    /// 创建新的生成引擎
    ///
    /// # 参数
    /// - repos: 仓储集合
    /// - calendar: 停课日历快照
    /// - settings: 生成参数
    pub fn new(
        repos: ClassGenRepositories,
        calendar: Arc<dyn ExclusionCalendar>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            repos,
            calendar,
            settings,
        }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn repositories(&self) -> &ClassGenRepositories {
        &self.repos
    }

    // ==========================================
    // 对外操作
    // ==========================================

    /// 按窗口生成
    ///
    /// # 返回
    /// - Ok(GenerationSummary): 单项失败记录在 errors 中
    /// - Err: 无法读取报名/模板列表, 或指定报名不存在
    #[instrument(skip(self, window), fields(window = %window))]
    pub fn generate_for_window(
        &self,
        window: DateWindow,
        scope: GenerationScope,
    ) -> EngineResult<GenerationSummary> {
        let mut ctx = RunContext::new(Mode::Persist);
        self.walk_scope(&mut ctx, &window, scope)?;
        let (summary, _) = ctx.finish();
        Ok(summary)
    }

    /// 预览 (不写库)
    ///
    /// 与生成使用同一展开与策略, 重复判定基于已持久化课次。
    #[instrument(skip(self, window), fields(window = %window))]
    pub fn preview(&self, window: DateWindow, scope: GenerationScope) -> EngineResult<PreviewReport> {
        let mut ctx = RunContext::new(Mode::DryRun);
        self.walk_scope(&mut ctx, &window, scope)?;
        let (summary, entries) = ctx.finish();
        Ok(PreviewReport { entries, summary })
    }

    /// 月度任务: 窗口 [today, 下下个月1号)
    ///
    /// 开启 backfill_from_last_run 时, 窗口起点取 min(today, 上次月度窗口末尾)。
    #[instrument(skip(self))]
    pub fn run_monthly(&self, today: NaiveDate) -> EngineResult<GenerationSummary> {
        let started_at = now();
        let window = self.monthly_window(today);

        info!(window = %window, "月度课次生成开始");
        let summary = self.generate_for_window(window, GenerationScope::AllActive)?;
        self.record_run(RunTrigger::Monthly, window, started_at, &summary);

        info!(
            created = summary.created,
            skipped = summary.skipped,
            errors = summary.error_count(),
            enrollments = summary.enrollments_processed,
            calendar_warnings = summary.calendar_warnings,
            "月度课次生成完成"
        );
        Ok(summary)
    }

    /// 手工指定窗口运行 (记录运行日志)
    #[instrument(skip(self, window), fields(window = %window))]
    pub fn run_window(&self, window: DateWindow, scope: GenerationScope) -> EngineResult<GenerationSummary> {
        let started_at = now();
        let summary = self.generate_for_window(window, scope)?;
        self.record_run(RunTrigger::Window, window, started_at, &summary);
        info!(
            created = summary.created,
            skipped = summary.skipped,
            errors = summary.error_count(),
            "窗口课次生成完成"
        );
        Ok(summary)
    }

    /// 入学生成: 对报名的每个启用模板生成 [valid_from, valid_from + N 个月)
    ///
    /// # 返回
    /// - Err(EnrollmentNotFound): 报名不存在
    /// - Ok: 非 active 报名返回空结果
    #[instrument(skip(self))]
    pub fn generate_for_enrollment(&self, enrollment_id: i64) -> EngineResult<GenerationSummary> {
        let started_at = now();
        let enrollment = self.load_enrollment(enrollment_id)?;
        if !GenerationPolicy::enrollment_eligible(&enrollment) {
            info!(enrollment_id, status = %enrollment.status, "报名非 active, 跳过入学生成");
            return Ok(GenerationSummary::default());
        }

        let templates = retry_transient(self.settings.max_item_retries, "list_templates", || {
            self.repos.template_repo.list_active_by_enrollment(enrollment_id)
        })?;

        let mut ctx = RunContext::new(Mode::Persist);
        ctx.summary.enrollments_processed = 1;
        let mut covered: Option<DateWindow> = None;
        for template in &templates {
            let window = DateWindow::onboarding(template.valid_from, self.settings.onboarding_months);
            covered = Some(match covered {
                Some(c) => DateWindow::new(c.from.min(window.from), c.to.max(window.to)),
                None => window,
            });
            self.process_template(&mut ctx, &enrollment, template, &window);
        }
        let (summary, _) = ctx.finish();

        if let Some(window) = covered {
            self.record_run(RunTrigger::Onboarding, window, started_at, &summary);
        }
        info!(
            enrollment_id,
            templates = templates.len(),
            created = summary.created,
            skipped = summary.skipped,
            errors = summary.error_count(),
            "入学课次生成完成"
        );
        Ok(summary)
    }

    /// 单个新模板的入学生成
    ///
    /// 模板所属报名不存在时记为数据错误, 不返回 Err。
    #[instrument(skip(self))]
    pub fn generate_for_template(&self, template_id: i64) -> EngineResult<GenerationSummary> {
        let started_at = now();
        let template = retry_transient(self.settings.max_item_retries, "find_template", || {
            self.repos.template_repo.find_by_id(template_id)
        })?
        .ok_or(EngineError::TemplateNotFound(template_id))?;

        let window = DateWindow::onboarding(template.valid_from, self.settings.onboarding_months);
        let mut ctx = RunContext::new(Mode::Persist);

        let enrollment = retry_transient(self.settings.max_item_retries, "find_enrollment", || {
            self.repos.enrollment_repo.find_by_id(template.enrollment_id)
        })?;
        match enrollment {
            None => ctx.summary.errors.push(orphan_error(&template)),
            Some(e) if !GenerationPolicy::enrollment_eligible(&e) => {
                info!(enrollment_id = e.enrollment_id, status = %e.status, "报名非 active, 跳过模板生成");
            }
            Some(e) => {
                ctx.summary.enrollments_processed = 1;
                self.process_template(&mut ctx, &e, &template, &window);
            }
        }

        let (summary, _) = ctx.finish();
        self.record_run(RunTrigger::Onboarding, window, started_at, &summary);
        info!(
            template_id,
            window = %window,
            created = summary.created,
            skipped = summary.skipped,
            "模板课次生成完成"
        );
        Ok(summary)
    }

    /// 月度窗口 (考虑水位线)
    pub fn monthly_window(&self, today: NaiveDate) -> DateWindow {
        let window = DateWindow::monthly(today);
        if !self.settings.backfill_from_last_run {
            return window;
        }
        match self.repos.run_repo.last_completed(RunTrigger::Monthly) {
            Ok(Some(last)) if last.window_to < today => {
                info!(watermark = %last.window_to, "从上次月度窗口末尾补生成");
                DateWindow::new(last.window_to, window.to)
            }
            Ok(_) => window,
            Err(e) => {
                warn!(error = %e, "读取上次运行记录失败, 使用默认窗口");
                window
            }
        }
    }

    // ==========================================
    // 内部实现
    // ==========================================

    fn load_enrollment(&self, enrollment_id: i64) -> EngineResult<Enrollment> {
        retry_transient(self.settings.max_item_retries, "find_enrollment", || {
            self.repos.enrollment_repo.find_by_id(enrollment_id)
        })?
        .ok_or(EngineError::EnrollmentNotFound(enrollment_id))
    }

    fn walk_scope(&self, ctx: &mut RunContext, window: &DateWindow, scope: GenerationScope) -> EngineResult<()> {
        match scope {
            GenerationScope::Enrollment(enrollment_id) => {
                let enrollment = self.load_enrollment(enrollment_id)?;
                if !GenerationPolicy::enrollment_eligible(&enrollment) {
                    debug!(enrollment_id, status = %enrollment.status, "报名非 active, 不生成");
                    return Ok(());
                }
                let templates = retry_transient(self.settings.max_item_retries, "list_templates", || {
                    self.repos.template_repo.list_active_by_enrollment(enrollment_id)
                })?;
                self.process_enrollment(ctx, &enrollment, &templates, window);
            }
            GenerationScope::AllActive => {
                let enrollments = retry_transient(self.settings.max_item_retries, "list_enrollments", || {
                    self.repos.enrollment_repo.list_by_status(EnrollmentStatus::Active)
                })?;
                let templates = retry_transient(self.settings.max_item_retries, "list_templates", || {
                    self.repos.template_repo.list_active()
                })?;

                let mut by_enrollment: BTreeMap<i64, Vec<RecurrenceTemplate>> = BTreeMap::new();
                for template in templates {
                    by_enrollment.entry(template.enrollment_id).or_default().push(template);
                }

                let active_ids: HashSet<i64> = enrollments.iter().map(|e| e.enrollment_id).collect();
                for enrollment in &enrollments {
                    let templates = by_enrollment
                        .get(&enrollment.enrollment_id)
                        .map(Vec::as_slice)
                        .unwrap_or(&[]);
                    self.process_enrollment(ctx, enrollment, templates, window);
                }

                // 非 active 报名的模板: 报名已不存在时记为数据错误
                for (enrollment_id, templates) in by_enrollment
                    .iter()
                    .filter(|(id, _)| !active_ids.contains(*id))
                {
                    self.check_orphans(ctx, *enrollment_id, templates, window);
                }
            }
        }
        Ok(())
    }

    fn check_orphans(
        &self,
        ctx: &mut RunContext,
        enrollment_id: i64,
        templates: &[RecurrenceTemplate],
        window: &DateWindow,
    ) {
        let relevant: Vec<&RecurrenceTemplate> = templates.iter().filter(|t| t.intersects(window)).collect();
        if relevant.is_empty() {
            return;
        }
        match retry_transient(self.settings.max_item_retries, "find_enrollment", || {
            self.repos.enrollment_repo.find_by_id(enrollment_id)
        }) {
            Ok(Some(_)) => {}
            Ok(None) => {
                for template in relevant {
                    warn!(enrollment_id, template_id = template.template_id, "模板引用的报名不存在");
                    ctx.summary.errors.push(orphan_error(template));
                }
            }
            Err(e) => {
                warn!(enrollment_id, error = %e, "读取报名失败");
                ctx.summary
                    .errors
                    .push(ItemError::persistence(enrollment_id, None, None, e.to_string()));
            }
        }
    }

    fn process_enrollment(
        &self,
        ctx: &mut RunContext,
        enrollment: &Enrollment,
        templates: &[RecurrenceTemplate],
        window: &DateWindow,
    ) {
        ctx.summary.enrollments_processed += 1;
        for template in templates {
            self.process_template(ctx, enrollment, template, window);
        }
    }

    fn process_template(
        &self,
        ctx: &mut RunContext,
        enrollment: &Enrollment,
        template: &RecurrenceTemplate,
        window: &DateWindow,
    ) {
        match GenerationPolicy::template_eligibility(template, window) {
            TemplateEligibility::Eligible => {}
            TemplateEligibility::Ignored => return,
            TemplateEligibility::Invalid(message) => {
                warn!(
                    enrollment_id = enrollment.enrollment_id,
                    template_id = template.template_id,
                    %message,
                    "模板数据错误, 跳过"
                );
                ctx.summary.errors.push(ItemError::data(
                    enrollment.enrollment_id,
                    Some(template.template_id),
                    message,
                ));
                return;
            }
        }

        ctx.summary.templates_processed += 1;
        for date in OccurrenceExpander::expand(template, window) {
            let decision = match GenerationPolicy::calendar_decision(self.calendar.as_ref(), date, &mut ctx.missing_years) {
                Some(reason) => Some(Decision::Skip(reason)),
                None => self.apply_date(ctx, enrollment, template, date),
            };

            let Some(decision) = decision else {
                continue;
            };
            match decision {
                Decision::Create => ctx.summary.record_created(),
                Decision::Skip(SkipReason::Duplicate) => ctx.summary.record_duplicate(),
                Decision::Skip(SkipReason::Holiday) => ctx.summary.record_holiday(),
            }
            debug!(
                enrollment_id = enrollment.enrollment_id,
                template_id = template.template_id,
                %date,
                ?decision,
                "候选日期判定"
            );
            if ctx.mode == Mode::DryRun {
                ctx.entries.push(PreviewEntry {
                    enrollment_id: enrollment.enrollment_id,
                    template_id: template.template_id,
                    date,
                    time: template.time_of_day,
                    decision,
                });
            }
        }
    }

    /// 非停课日: 创建或判重
    ///
    /// 返回 None 表示该日期持久化失败, 已记入错误。
    fn apply_date(
        &self,
        ctx: &mut RunContext,
        enrollment: &Enrollment,
        template: &RecurrenceTemplate,
        date: NaiveDate,
    ) -> Option<Decision> {
        let retries = self.settings.max_item_retries;
        let result = match ctx.mode {
            Mode::Persist => {
                let occurrence = NewOccurrence::regular(enrollment, template, date);
                retry_transient(retries, "create_occurrence", || {
                    self.repos.occurrence_repo.create_if_absent(&occurrence)
                })
                .map(|outcome| match outcome {
                    CreateOutcome::Created(_) => Decision::Create,
                    CreateOutcome::AlreadyExists => Decision::Skip(SkipReason::Duplicate),
                })
            }
            Mode::DryRun => retry_transient(retries, "exists_occurrence", || {
                self.repos
                    .occurrence_repo
                    .exists(enrollment.enrollment_id, date, template.time_of_day)
            })
            .map(|exists| {
                if exists {
                    Decision::Skip(SkipReason::Duplicate)
                } else {
                    Decision::Create
                }
            }),
        };

        match result {
            Ok(decision) => Some(decision),
            Err(e) => {
                warn!(
                    enrollment_id = enrollment.enrollment_id,
                    template_id = template.template_id,
                    %date,
                    error = %e,
                    "课次写入失败"
                );
                ctx.summary.errors.push(ItemError::persistence(
                    enrollment.enrollment_id,
                    Some(template.template_id),
                    Some(date),
                    e.to_string(),
                ));
                None
            }
        }
    }

    /// 写运行记录; 失败只告警, 不影响本次结果
    fn record_run(&self, trigger: RunTrigger, window: DateWindow, started_at: NaiveDateTime, summary: &GenerationSummary) {
        let run = GenerationRun {
            run_id: Uuid::new_v4().to_string(),
            trigger,
            window_from: window.from,
            window_to: window.to,
            created: summary.created,
            skipped: summary.skipped,
            errors: summary.error_count(),
            calendar_warnings: summary.calendar_warnings,
            status: if summary.has_errors() {
                RunStatus::CompletedWithErrors
            } else {
                RunStatus::Completed
            },
            started_at,
            finished_at: now(),
        };
        if let Err(e) = retry_transient(self.settings.max_item_retries, "record_run", || {
            self.repos.run_repo.insert(&run)
        }) {
            warn!(run_id = %run.run_id, error = %e, "运行记录写入失败");
        }
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn orphan_error(template: &RecurrenceTemplate) -> ItemError {
    ItemError::data(
        template.enrollment_id,
        Some(template.template_id),
        format!(
            "模板 {} 引用的报名 {} 不存在",
            template.template_id, template.enrollment_id
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::HolidayCalendar;
    use crate::db::open_in_memory_with_schema;
    use crate::domain::types::ClassFormat;
    use chrono::Weekday;
    use std::sync::Mutex;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn setup(calendar: HolidayCalendar) -> GenerationEngine {
        let conn = Arc::new(Mutex::new(open_in_memory_with_schema().unwrap()));
        GenerationEngine::new(
            ClassGenRepositories::from_connection(conn),
            Arc::new(calendar),
            GenerationSettings::default(),
        )
    }

    fn seed(engine: &GenerationEngine) -> (i64, i64) {
        let repos = engine.repositories();
        let enrollment_id = repos
            .enrollment_repo
            .insert(&Enrollment::new(3, ClassFormat::Individual))
            .unwrap();
        let template_id = repos
            .template_repo
            .insert(&RecurrenceTemplate::weekly(
                enrollment_id,
                3,
                Weekday::Tue,
                NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
                d(2025, 10, 20),
            ))
            .unwrap();
        (enrollment_id, template_id)
    }

    #[test]
    fn test_preview_does_not_write() {
        let engine = setup(HolidayCalendar::from_dates([d(2025, 11, 11)]));
        let (enrollment_id, _) = seed(&engine);
        let window = DateWindow::new(d(2025, 10, 20), d(2025, 12, 1));

        let report = engine.preview(window, GenerationScope::Enrollment(enrollment_id)).unwrap();
        assert_eq!(report.entries.len(), 6);
        assert_eq!(report.summary.created, 5);
        assert_eq!(report.summary.skipped_holiday, 1);
        assert_eq!(engine.repositories().occurrence_repo.count_all().unwrap(), 0);
    }

    #[test]
    fn test_monthly_window_with_watermark() {
        let conn = Arc::new(Mutex::new(open_in_memory_with_schema().unwrap()));
        let settings = GenerationSettings {
            backfill_from_last_run: true,
            ..GenerationSettings::default()
        };
        let engine = GenerationEngine::new(
            ClassGenRepositories::from_connection(conn),
            Arc::new(HolidayCalendar::new()),
            settings,
        );

        // 无历史记录时使用默认窗口
        assert_eq!(engine.monthly_window(d(2025, 12, 10)), DateWindow::monthly(d(2025, 12, 10)));

        // 上次窗口止于 2025-12-01, 今天 2026-01-10 → 从 12-01 补生成
        engine.run_monthly(d(2025, 10, 10)).unwrap();
        let window = engine.monthly_window(d(2026, 1, 10));
        assert_eq!(window, DateWindow::new(d(2025, 12, 1), d(2026, 3, 1)));
    }

    #[test]
    fn test_unknown_enrollment_is_whole_operation_error() {
        let engine = setup(HolidayCalendar::new());
        let err = engine.generate_for_enrollment(404).unwrap_err();
        assert!(matches!(err, EngineError::EnrollmentNotFound(404)));
    }
}
