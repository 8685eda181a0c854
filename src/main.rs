// ==========================================
// 音乐学校排课系统 - 守护进程入口
// ==========================================
// 职责: 打开数据库 → 建表 → 写入内置节假日 → 启动月度调度, Ctrl-C 退出
// 用法: classgen [db_path]
// ==========================================

use anyhow::Context;
use classgen::app::{get_default_db_path, AppState};
use classgen::scheduler::{
    AtomicFlightGuard, MonthlyCadence, MonthlyGenerationJob, SchedulerTrigger, SystemClock,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    classgen::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} - 课次生成服务", classgen::APP_NAME);
    tracing::info!("系统版本: {}", classgen::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径
    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).context("无法初始化AppState")?;
    let seeded = state.seed_holidays().context("写入内置节假日失败")?;
    if seeded > 0 {
        tracing::info!(seeded, "首次启动，已写入内置节假日");
    }

    let cadence = MonthlyCadence::from_config(state.config.as_ref()).context("读取调度配置失败")?;
    tracing::info!(
        day = cadence.day,
        hour = cadence.hour,
        timezone = %cadence.tz,
        "月度任务节奏"
    );

    let trigger = Arc::new(SchedulerTrigger::new(
        Arc::new(MonthlyGenerationJob::new(state.conn.clone())),
        Arc::new(AtomicFlightGuard::new()),
        Arc::new(SystemClock),
        cadence,
    ));

    trigger
        .run_until_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "监听退出信号失败");
            }
        })
        .await;

    tracing::info!("服务已退出");
    Ok(())
}
