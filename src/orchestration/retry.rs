//! 指数退避重试
//!
//! 第 attempt 次（从 0 计）失败后等待 base_delay * 2^attempt（上限 max_delay，可叠加抖动）；
//! 连续 max_retries 次重试仍失败则返回 RetryExhausted（携带最后一个错误）。
//! 退避只挂起当前步骤，不阻塞其它并发步骤。

use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

use crate::core::EngineError;
use crate::orchestration::types::{Step, StepResult, StepTracker};
use crate::orchestration::StepRunner;

/// 抖动策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Jitter {
    /// 不加抖动
    #[default]
    None,
    /// [0, d] 均匀分布
    Full,
    /// d/2 + [0, d/2] 均匀分布
    Equal,
}

/// 重试策略
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: Jitter,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: Jitter::None,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// 不含抖动的退避：base * 2^attempt，上限 max_delay
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// 实际等待时长（含抖动）
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let d = self.backoff(attempt);
        let ms = d.as_millis().min(u64::MAX as u128) as u64;
        match self.jitter {
            Jitter::None => d,
            Jitter::Full => Duration::from_millis(rand::thread_rng().gen_range(0..=ms)),
            Jitter::Equal => {
                let half = ms / 2;
                Duration::from_millis(half + rand::thread_rng().gen_range(0..=ms - half))
            }
        }
    }
}

/// 按策略执行步骤：成功即短路；调用方错误不重试，原样失败
pub async fn run_with_retry(runner: &dyn StepRunner, step: &Step, policy: &RetryPolicy) -> StepResult {
    let mut tracker = StepTracker::new(&step.name, true);
    let mut attempt: u32 = 0;
    loop {
        tracker.begin_attempt();
        let err = match runner.run_step(step).await {
            Ok(value) => return tracker.succeed(value),
            Err(e) if !e.is_retryable() => return tracker.fail(e),
            Err(e) => e,
        };
        tracker.mark_failed();

        if attempt >= policy.max_retries {
            tracing::warn!(step = %step.name, attempts = attempt + 1, error = %err, "retries exhausted");
            return tracker.fail(EngineError::RetryExhausted {
                attempts: attempt + 1,
                last: Box::new(err),
            });
        }

        let delay = policy.delay_for(attempt);
        tracing::warn!(
            step = %step.name,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "step failed, backing off"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
