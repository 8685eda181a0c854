// ==========================================
// 音乐学校排课系统 - 单飞保护
// ==========================================
// 同一任务同一时刻只允许一个实例运行;
// 重叠的触发被抑制 (记日志, 不算错误)
// ==========================================

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 运行许可, Drop 时释放
pub struct FlightPermit {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl FlightPermit {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for FlightPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlightPermit")
            .field("held", &self.release.is_some())
            .finish()
    }
}

// ==========================================
// SingleFlight Trait
// ==========================================
pub trait SingleFlight: Send + Sync {
    /// 尝试获取运行许可; 已有实例运行时返回 None
    fn try_acquire(&self) -> Option<FlightPermit>;
}

/// 基于 AtomicBool 的进程内单飞保护
#[derive(Debug, Clone, Default)]
pub struct AtomicFlightGuard {
    running: Arc<AtomicBool>,
}

impl AtomicFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl SingleFlight for AtomicFlightGuard {
    fn try_acquire(&self) -> Option<FlightPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        let running = Arc::clone(&self.running);
        Some(FlightPermit::new(move || running.store(false, Ordering::Release)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused_until_release() {
        let guard = AtomicFlightGuard::new();
        let permit = guard.try_acquire();
        assert!(permit.is_some());
        assert!(guard.is_running());
        assert!(guard.try_acquire().is_none());

        drop(permit);
        assert!(!guard.is_running());
        assert!(guard.try_acquire().is_some());
    }
}
