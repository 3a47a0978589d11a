//! 编排客户端
//!
//! 持有 StepRunner、重试策略、并发上限与扇出模式，对外提供四种组合算法。

use std::sync::Arc;

use crate::config::OrchestrationSection;
use crate::core::{EngineError, TaskContext};
use crate::orchestration::{
    chain, fanout, retry, router, FanOutMode, OrchestrationRun, RetryPolicy, Step, StepResult,
    StepRouter, StepRunner,
};

pub struct OrchestrationClient {
    runner: Arc<dyn StepRunner>,
    retry: RetryPolicy,
    concurrency: usize,
    fan_out_mode: FanOutMode,
}

impl OrchestrationClient {
    pub fn new(runner: Arc<dyn StepRunner>) -> Self {
        Self {
            runner,
            retry: RetryPolicy::default(),
            concurrency: 4,
            fan_out_mode: FanOutMode::CollectAll,
        }
    }

    /// 按 [orchestration] 配置段构建
    pub fn from_config(runner: Arc<dyn StepRunner>, cfg: &OrchestrationSection) -> Self {
        Self::new(runner)
            .with_retry_policy(cfg.retry_policy())
            .with_concurrency(cfg.concurrency)
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    pub fn with_fan_out_mode(mut self, mode: FanOutMode) -> Self {
        self.fan_out_mode = mode;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// 单次执行
    pub async fn run_step(&self, step: &Step) -> StepResult {
        fanout::run_once(self.runner.as_ref(), step).await
    }

    /// 带指数退避的重试；step.max_retries 优先于客户端策略
    pub async fn run_with_retry(&self, step: &Step) -> StepResult {
        let policy = match step.max_retries {
            Some(n) => self.retry.clone().with_max_retries(n),
            None => self.retry.clone(),
        };
        retry::run_with_retry(self.runner.as_ref(), step, &policy).await
    }

    /// 有界并发扇出，结果按输入顺序
    pub async fn fan_out(&self, steps: Vec<Step>) -> Vec<StepResult> {
        fanout::fan_out(
            Arc::clone(&self.runner),
            steps,
            self.concurrency,
            self.fan_out_mode,
        )
        .await
    }

    /// 条件路由
    pub async fn route(
        &self,
        discriminant: &str,
        routes: &StepRouter,
    ) -> Result<StepResult, EngineError> {
        router::dispatch(self.runner.as_ref(), routes, discriminant).await
    }

    /// 顺序链
    pub async fn chain(&self, steps: &[Step], initial: Option<TaskContext>) -> OrchestrationRun {
        chain::run_chain(self.runner.as_ref(), steps, initial, &self.retry).await
    }
}
