//! 重试策略
//!
//! 只重试可重试的网络错误（连接失败、超时），认证与解析错误直接返回。

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::AppResult;

/// 有界指数退避
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 总尝试次数（含第一次）
    pub max_attempts: u32,
    /// 第一次重试前的等待
    pub floor: Duration,
    /// 单次等待上限
    pub ceiling: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            floor: Duration::from_secs(4),
            ceiling: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, floor: Duration, ceiling: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            floor,
            ceiling: ceiling.max(floor),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_secs(config.retry_floor_secs),
            Duration::from_secs(config.retry_ceiling_secs),
        )
    }

    /// 第 `failed_attempts` 次失败后的等待时间：`min(ceiling, floor * 2^(n-1))`
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(31);
        let delay = self.floor.saturating_mul(1u32 << exponent);
        delay.min(self.ceiling)
    }

    /// 执行操作，可重试错误按退避等待后再试
    pub async fn run<F, Fut, T>(&self, context: &str, mut operation: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} 在第 {} 次尝试成功", context, attempt);
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} 失败 (尝试 {}/{}): {}，{:?} 后重试",
                        context, attempt, self.max_attempts, err, delay
                    );
                    sleep(delay).await;
                }
                Err(err) => {
                    if err.is_retryable() {
                        warn!("{} 失败，已尝试 {} 次", context, attempt);
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_grows_and_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(4));
        assert_eq!(policy.delay_for(2), Duration::from_secs(8));
        assert_eq!(policy.delay_for(3), Duration::from_secs(10));
        assert_eq!(policy.delay_for(40), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_network_errors_until_exhausted() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: AppResult<()> = policy
            .run("测试请求", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::network_retryable("http://x", "connection refused")) }
            })
            .await;

        assert!(matches!(result, Err(AppError::Network { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(50));
        let calls = AtomicU32::new(0);

        let result = policy
            .run("测试请求", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(AppError::network_retryable("http://x", "timeout"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_non_retryable_errors_return_immediately() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: AppResult<()> = policy
            .run("测试请求", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::Authentication("bad".into())) }
            })
            .await;

        assert!(matches!(result, Err(AppError::Authentication(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let status: AppResult<()> = policy
            .run("测试请求", || async { Err(AppError::http_status("http://x", 500)) })
            .await;
        assert!(matches!(status, Err(AppError::Network { retryable: false, .. })));
    }
}
