// ==========================================
// 音乐学校排课系统 - 调度触发器
// ==========================================
// 职责: 按月度节奏触发生成任务
// 红线: 同一任务不得与自身并发; 重叠触发记日志后跳过, 不算错误
// 说明: 循环每次最多休眠一小时后重新对时, 避免长休眠期间的时钟漂移
// ==========================================

use crate::engine::GenerationSummary;
use crate::scheduler::cadence::MonthlyCadence;
use crate::scheduler::clock::Clock;
use crate::scheduler::job::ScheduledJob;
use crate::scheduler::single_flight::SingleFlight;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const MAX_SLEEP: Duration = Duration::from_secs(3600);

/// 单次触发的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Completed(GenerationSummary),
    /// 上一次运行尚未结束, 本次被抑制
    Suppressed,
    Failed(String),
}

// ==========================================
// SchedulerTrigger - 调度触发器
// ==========================================
pub struct SchedulerTrigger {
    job: Arc<dyn ScheduledJob>,
    guard: Arc<dyn SingleFlight>,
    clock: Arc<dyn Clock>,
    cadence: MonthlyCadence,
}

impl SchedulerTrigger {
    pub fn new(
        job: Arc<dyn ScheduledJob>,
        guard: Arc<dyn SingleFlight>,
        clock: Arc<dyn Clock>,
        cadence: MonthlyCadence,
    ) -> Self {
        Self {
            job,
            guard,
            clock,
            cadence,
        }
    }

    pub fn cadence(&self) -> &MonthlyCadence {
        &self.cadence
    }

    /// 立即触发一次 (受单飞保护)
    pub async fn fire(&self) -> TriggerOutcome {
        let Some(_permit) = self.guard.try_acquire() else {
            info!(job = self.job.name(), "上一次运行尚未结束, 本次触发跳过");
            return TriggerOutcome::Suppressed;
        };

        let today = self.cadence.today_in(self.clock.now());
        info!(job = self.job.name(), %today, "定时任务开始");
        match self.job.run(today).await {
            Ok(summary) => {
                info!(
                    job = self.job.name(),
                    created = summary.created,
                    skipped = summary.skipped,
                    errors = summary.error_count(),
                    "定时任务完成"
                );
                TriggerOutcome::Completed(summary)
            }
            Err(e) => {
                error!(job = self.job.name(), error = %e, "定时任务失败");
                TriggerOutcome::Failed(e.to_string())
            }
        }
    }

    /// 按节奏循环触发, 直到 shutdown 完成
    ///
    /// 每次触发在独立任务中运行, 运行时间超过一个周期时由单飞保护抑制下一次。
    pub async fn run_until_shutdown<F>(self: Arc<Self>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut next = self.cadence.next_fire_after(self.clock.now());
        info!(job = self.job.name(), next_fire = %next, "调度器启动");

        loop {
            let now = self.clock.now();
            if now >= next {
                let trigger = Arc::clone(&self);
                tokio::spawn(async move {
                    trigger.fire().await;
                });
                next = self.cadence.next_fire_after(now);
                info!(job = self.job.name(), next_fire = %next, "下一次触发时间");
            }

            let wait = (next - now).to_std().unwrap_or(Duration::ZERO).min(MAX_SLEEP);
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = &mut shutdown => {
                    info!(job = self.job.name(), "调度器停止");
                    break;
                }
            }
        }
    }
}
