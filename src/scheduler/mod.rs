// ==========================================
// 音乐学校排课系统 - 调度层
// ==========================================
// 职责: 月度定时触发生成任务
// 说明: 与引擎正确性无关, 可由任何 cron 类驱动替代
// ==========================================

pub mod cadence;
pub mod clock;
pub mod job;
pub mod single_flight;
pub mod trigger;

pub use cadence::MonthlyCadence;
pub use clock::{Clock, FixedClock, SystemClock};
pub use job::{JobError, MonthlyGenerationJob, ScheduledJob};
pub use single_flight::{AtomicFlightGuard, FlightPermit, SingleFlight};
pub use trigger::{SchedulerTrigger, TriggerOutcome};
