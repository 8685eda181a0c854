// ==========================================
// 音乐学校排课系统 - 配置读取 Trait
// ==========================================
// 职责: 定义调度与生成所需的配置读取接口 (不包含实现)
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::repository::RepositoryResult;
use chrono_tz::Tz;

// ==========================================
// ClassGenConfigReader Trait
// ==========================================
// 实现者: ConfigManager (从 config_kv 表读取)
pub trait ClassGenConfigReader: Send + Sync {
    // ===== 调度配置 =====

    /// 学校所在时区 (IANA 名称)
    ///
    /// # 默认值
    /// - America/La_Paz
    fn timezone(&self) -> RepositoryResult<Tz>;

    /// 月度任务执行日 (1~28)
    ///
    /// # 默认值
    /// - 10
    fn monthly_run_day(&self) -> RepositoryResult<u32>;

    /// 月度任务执行小时 (0~23, 本地时间)
    ///
    /// # 默认值
    /// - 2
    fn monthly_run_hour(&self) -> RepositoryResult<u32>;

    // ===== 生成配置 =====

    /// 入学生成窗口月数
    ///
    /// # 默认值
    /// - 2
    fn onboarding_months(&self) -> RepositoryResult<u32>;

    /// 单项瞬时失败重试次数
    ///
    /// # 默认值
    /// - 1
    fn max_item_retries(&self) -> RepositoryResult<u32>;

    /// 月度任务是否从上次窗口末尾补生成
    ///
    /// # 默认值
    /// - false
    fn backfill_from_last_run(&self) -> RepositoryResult<bool>;
}
