// ==========================================
// 音乐学校排课系统 - 单项持久化重试
// ==========================================
// 仅重试瞬时错误 (SQLite busy/locked), 数据类错误与锁中毒立即返回
// ==========================================

use crate::repository::RepositoryResult;
use tracing::warn;

/// 执行持久化操作, 瞬时错误最多重试 max_retries 次
pub fn retry_transient<T, F>(max_retries: u32, op: &str, mut f: F) -> RepositoryResult<T>
where
    F: FnMut() -> RepositoryResult<T>,
{
    let mut attempt = 0u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < max_retries => {
                attempt += 1;
                warn!(op, attempt, error = %e, "持久化瞬时失败, 重试");
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryError;
    use std::cell::Cell;

    #[test]
    fn test_retries_transient_once_then_succeeds() {
        let calls = Cell::new(0);
        let result = retry_transient(1, "create", || {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                Err(RepositoryError::DatabaseBusy("busy".into()))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_gives_up_after_max_retries() {
        let calls = Cell::new(0);
        let result: RepositoryResult<()> = retry_transient(1, "create", || {
            calls.set(calls.get() + 1);
            Err(RepositoryError::DatabaseBusy("busy".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_non_transient_is_not_retried() {
        let calls = Cell::new(0);
        let result: RepositoryResult<()> = retry_transient(3, "create", || {
            calls.set(calls.get() + 1);
            Err(RepositoryError::FieldValueError {
                field: "class_date".into(),
                message: "bad".into(),
            })
        });
        assert!(!result.unwrap_err().is_transient());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_poisoned_lock_is_not_retried() {
        let calls = Cell::new(0);
        let result: RepositoryResult<()> = retry_transient(3, "create", || {
            calls.set(calls.get() + 1);
            Err(RepositoryError::LockError("poisoned".into()))
        });
        assert!(matches!(result, Err(RepositoryError::LockError(_))));
        assert_eq!(calls.get(), 1);
    }
}
