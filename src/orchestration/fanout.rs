//! 有界并发扇出
//!
//! 最多 W 个步骤同时执行（Semaphore 许可按输入顺序发放），每个步骤只执行一次；
//! 结果按输入顺序返回。默认收集全部结局，FailFast 为显式选择：首个失败后取消其余步骤。

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::core::EngineError;
use crate::orchestration::types::{Step, StepOutcome, StepResult, StepTracker};
use crate::orchestration::StepRunner;

/// 扇出模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanOutMode {
    /// 失败不影响兄弟步骤，等待全部完成
    #[default]
    CollectAll,
    /// 首个失败后取消正在执行与尚未调度的步骤（结局为 Cancelled）
    FailFast,
}

/// 单次执行步骤（扇出与路由共用：第一个结局即最终结局）
pub async fn run_once(runner: &dyn StepRunner, step: &Step) -> StepResult {
    let mut tracker = StepTracker::new(&step.name, false);
    tracker.begin_attempt();
    match runner.run_step(step).await {
        Ok(value) => tracker.succeed(value),
        Err(e) => tracker.fail(e),
    }
}

pub async fn fan_out(
    runner: Arc<dyn StepRunner>,
    steps: Vec<Step>,
    limit: usize,
    mode: FanOutMode,
) -> Vec<StepResult> {
    let total = steps.len();
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let token = CancellationToken::new();
    let mut slots: Vec<Option<StepResult>> = (0..total).map(|_| None).collect();
    let mut names: Vec<String> = Vec::with_capacity(total);
    let mut set = JoinSet::new();

    let mut pending = steps.into_iter().enumerate();
    while let Some((idx, step)) = pending.next() {
        names.push(step.name.clone());
        let permit = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            permit = semaphore.clone().acquire_owned() => permit.ok(),
        };
        let Some(permit) = permit else {
            slots[idx] = Some(StepResult::cancelled(&step.name));
            for (idx, step) in pending.by_ref() {
                names.push(step.name.clone());
                slots[idx] = Some(StepResult::cancelled(&step.name));
            }
            break;
        };

        let runner = Arc::clone(&runner);
        let token = token.clone();
        set.spawn(async move {
            let _permit = permit;
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    let mut tracker = StepTracker::new(&step.name, false);
                    tracker.begin_attempt();
                    tracker.fail(EngineError::Cancelled)
                }
                result = run_once(runner.as_ref(), &step) => result,
            };
            if mode == FanOutMode::FailFast && !result.succeeded() {
                token.cancel();
            }
            (idx, result)
        });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, result)) => slots[idx] = Some(result),
            Err(e) => tracing::error!(error = %e, "fan-out branch aborted"),
        }
    }

    // 分支 panic 时没有结果，补一个失败结局
    slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| {
            slot.unwrap_or_else(|| StepResult {
                step_name: names.get(idx).cloned().unwrap_or_default(),
                attempt_count: 1,
                outcome: StepOutcome::Failure(EngineError::AgentInternalError(
                    "fan-out branch panicked".to_string(),
                )),
                elapsed: std::time::Duration::ZERO,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExecutionResult, ResultStatus};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// 记录最大并发数；任务名含 "fail" 时失败，按任务里的毫秒数睡眠
    #[derive(Default)]
    struct CountingRunner {
        in_flight: AtomicUsize,
        max_seen: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StepRunner for CountingRunner {
        async fn run_step(&self, step: &Step) -> Result<ExecutionResult, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            let ms: u64 = step
                .task
                .split_whitespace()
                .find_map(|w| w.parse().ok())
                .unwrap_or(10);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if step.task.contains("fail") {
                return Err(EngineError::AgentInternalError(format!("{} failed", step.name)));
            }
            Ok(ExecutionResult {
                status: ResultStatus::Success,
                task: step.task.clone(),
                response: Some(format!("done {}", step.name)),
                error: None,
                error_kind: None,
                agent: "sample-agent".into(),
                model: "gpt-4".into(),
                context_provided: false,
                context_keys: None,
                data: Default::default(),
                duration_seconds: 0.0,
                timestamp: chrono::Utc::now(),
            })
        }
    }

    fn steps(tasks: &[&str]) -> Vec<Step> {
        tasks
            .iter()
            .enumerate()
            .map(|(i, t)| Step::new(format!("task{}", i + 1), *t))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_collects_all_in_input_order() {
        let counter = Arc::new(CountingRunner::default());
        let runner: Arc<dyn StepRunner> = counter.clone();
        // 完成顺序与输入顺序不同
        let input = steps(&["50", "10", "fail 5", "30", "1"]);
        let results = fan_out(runner, input, 2, FanOutMode::CollectAll).await;

        assert_eq!(results.len(), 5);
        let names: Vec<&str> = results.iter().map(|r| r.step_name.as_str()).collect();
        assert_eq!(names, vec!["task1", "task2", "task3", "task4", "task5"]);
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.succeeded(), i != 2, "task{}", i + 1);
            assert_eq!(r.attempt_count, 1);
        }
        assert!(matches!(
            results[2].outcome.error(),
            Some(EngineError::AgentInternalError(_))
        ));
        assert_eq!(counter.calls.load(Ordering::SeqCst), 5);
        assert!(counter.max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_limit_is_reached_not_exceeded() {
        let counter = Arc::new(CountingRunner::default());
        let runner: Arc<dyn StepRunner> = counter.clone();
        let results = fan_out(runner, steps(&["20"; 8]), 3, FanOutMode::CollectAll).await;
        assert!(results.iter().all(StepResult::succeeded));
        assert_eq!(counter.max_seen.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_fast_cancels_siblings() {
        let counter = Arc::new(CountingRunner::default());
        let runner: Arc<dyn StepRunner> = counter.clone();
        let input = steps(&["fail 1", "1000", "1000", "1000"]);
        let results = fan_out(runner, input, 2, FanOutMode::FailFast).await;

        assert_eq!(results.len(), 4);
        assert!(matches!(
            results[0].outcome.error(),
            Some(EngineError::AgentInternalError(_))
        ));
        for r in &results[1..] {
            assert_eq!(r.outcome.error(), Some(&EngineError::Cancelled), "{}", r.step_name);
        }
    }

    #[tokio::test]
    async fn test_empty_input() {
        let runner: Arc<dyn StepRunner> = Arc::new(CountingRunner::default());
        assert!(fan_out(runner, Vec::new(), 4, FanOutMode::CollectAll).await.is_empty());
    }
}
