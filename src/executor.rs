//! 任务执行器
//!
//! 在 AgentConfig.timeout_seconds 期限内调用一次 Agent，记录耗时并把结果规范化为 ExecutionResult；
//! 无论成功失败都向账本追加一条记录（输入校验失败除外），并输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::agent::{Agent, AgentOutcome};
use crate::core::{EngineError, ExecutionResult, ResultStatus, Task, TaskContext};
use crate::history::{ExecutionLedger, ExecutionRecord};

/// 任务执行器：唯一向账本追加记录的组件
pub struct TaskExecutor {
    ledger: Arc<ExecutionLedger>,
}

impl TaskExecutor {
    pub fn new(ledger: Arc<ExecutionLedger>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Arc<ExecutionLedger> {
        &self.ledger
    }

    /// 执行一条任务描述；见 execute_task
    pub async fn execute(
        &self,
        agent: Arc<dyn Agent>,
        description: &str,
        context: Option<TaskContext>,
    ) -> Result<ExecutionResult, EngineError> {
        let mut task = Task::new(description, context);
        self.execute_task(agent, &mut task).await
    }

    /// 执行任务并推进其状态：
    /// - 描述为空：InvalidTask，不调用 Agent、不写账本
    /// - 超时：取消调用，任务 failed，写入失败记录后返回 ExecutionTimeout
/// - 调用方 future 被丢弃：执行单元取消 Agent 并写入一条 cancelled 记录
    /// - Agent 返回（含业务失败）：任务 completed，写入记录，返回信封
    pub async fn execute_task(
        &self,
        agent: Arc<dyn Agent>,
        task: &mut Task,
    ) -> Result<ExecutionResult, EngineError> {
        if task.description.trim().is_empty() {
            return Err(EngineError::InvalidTask(
                "task description must not be empty".to_string(),
            ));
        }
        if task.status != crate::core::TaskStatus::Idle {
            return Err(EngineError::InvalidTask(format!(
                "task is not idle: {:?}",
                task.status
            )));
        }

        let cfg = agent.config().clone();
        let agent_name = agent.name().to_string();
        task.start();

        // 执行单元自行决定结局并写账本；调用方 future 被丢弃时 guard 触发取消
        let token = CancellationToken::new();
        let guard = token.clone().drop_guard();
        let unit = tokio::spawn(run_unit(
            agent,
            Arc::clone(&self.ledger),
            task.description.clone(),
            task.context.clone(),
            token,
        ));
        let joined = unit.await;
        guard.disarm();

        let (envelope, end) = joined.map_err(|e| {
            EngineError::AgentInternalError(format!("execution unit aborted: {e}"))
        })?;
        let as_json = serde_json::to_value(&envelope).unwrap_or(serde_json::Value::Null);
        match end {
            UnitEnd::Returned => {
                task.complete(as_json);
                Ok(envelope)
            }
            UnitEnd::TimedOut => {
                task.fail(Some(as_json));
                Err(EngineError::ExecutionTimeout {
                    agent: agent_name,
                    timeout_secs: cfg.timeout_seconds,
                })
            }
            UnitEnd::Cancelled => {
                task.fail(Some(as_json));
                Err(EngineError::Cancelled)
            }
        }
    }
}

/// 执行单元的结局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitEnd {
    Returned,
    TimedOut,
    Cancelled,
}

impl UnitEnd {
    fn label(self, ok: bool) -> &'static str {
        match self {
            UnitEnd::Returned if ok => "ok",
            UnitEnd::Returned => "error",
            UnitEnd::TimedOut => "timeout",
            UnitEnd::Cancelled => "cancelled",
        }
    }
}

/// 一次调用：Agent 与期限、取消三方竞争，胜者唯一；结束前恰好追加一条记录
async fn run_unit(
    agent: Arc<dyn Agent>,
    ledger: Arc<ExecutionLedger>,
    description: String,
    context: Option<TaskContext>,
    token: CancellationToken,
) -> (ExecutionResult, UnitEnd) {
    let cfg = agent.config().clone();
    let agent_name = agent.name().to_string();
    let start = Instant::now();

    // Agent 放进独立任务，panic 不会带走执行单元
    let mut handle = {
        let agent = Arc::clone(&agent);
        let description = description.clone();
        let context = context.clone();
        tokio::spawn(async move { agent.execute(&description, context.as_ref()).await })
    };

    let (outcome, end) = tokio::select! {
        biased;
        _ = token.cancelled() => {
            handle.abort();
            (
                AgentOutcome::failure("cancelled", "execution cancelled by caller"),
                UnitEnd::Cancelled,
            )
        }
        raced = timeout(cfg.timeout(), &mut handle) => match raced {
            Ok(Ok(outcome)) => (outcome, UnitEnd::Returned),
            Ok(Err(join_err)) => (
                AgentOutcome::failure("panic", format!("agent task aborted: {join_err}")),
                UnitEnd::Returned,
            ),
            Err(_) => {
                handle.abort();
                (
                    AgentOutcome::failure(
                        "timeout",
                        format!("execution exceeded {}s", cfg.timeout_seconds),
                    ),
                    UnitEnd::TimedOut,
                )
            }
        },
    };
    let duration = start.elapsed();

    let envelope = build_envelope(
        &agent_name,
        &cfg.model,
        &description,
        context.as_ref(),
        outcome,
        duration.as_secs_f64(),
    );

    let audit = serde_json::json!({
        "event": "agent_audit",
        "agent": agent_name,
        "model": cfg.model,
        "ok": envelope.is_success(),
        "outcome": end.label(envelope.is_success()),
        "duration_ms": duration.as_millis() as u64,
        "task_preview": task_preview(&description),
    });
    tracing::info!(audit = %audit.to_string(), "agent");

    // 持久化失败只记日志，不影响返回给调用方的结果
    if let Err(e) = ledger.append(ExecutionRecord::new(&envelope)).await {
        tracing::warn!(agent = %agent_name, error = %e, "failed to append execution record");
    }
    tracing::info!(
        "Agent {} executed task in {:.2}s",
        agent_name,
        duration.as_secs_f64()
    );

    (envelope, end)
}

fn build_envelope(
    agent: &str,
    model: &str,
    task: &str,
    context: Option<&TaskContext>,
    outcome: AgentOutcome,
    duration_seconds: f64,
) -> ExecutionResult {
    let context_keys = context
        .filter(|c| !c.is_empty())
        .map(|c| c.keys().cloned().collect::<Vec<_>>());
    let mut result = ExecutionResult {
        status: ResultStatus::Success,
        task: task.to_string(),
        response: None,
        error: None,
        error_kind: None,
        agent: agent.to_string(),
        model: model.to_string(),
        context_provided: context.is_some(),
        context_keys,
        data: Default::default(),
        duration_seconds,
        timestamp: Utc::now(),
    };
    match outcome {
        AgentOutcome::Success(reply) => {
            result.response = Some(reply.response);
            result.data = reply.data;
        }
        AgentOutcome::Failure { kind, message } => {
            result.status = ResultStatus::Error;
            result.error = Some(message);
            result.error_kind = Some(kind);
        }
    }
    result
}

fn task_preview(task: &str) -> String {
    if task.chars().count() > 200 {
        format!("{}...", task.chars().take(200).collect::<String>())
    } else {
        task.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentConfig, SampleAgent};
    use crate::core::TaskStatus;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    struct SleepyAgent {
        config: AgentConfig,
    }

    #[async_trait]
    impl Agent for SleepyAgent {
        fn name(&self) -> &str {
            &self.config.name
        }

        fn config(&self) -> &AgentConfig {
            &self.config
        }

        async fn execute(&self, _task: &str, _context: Option<&TaskContext>) -> AgentOutcome {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            AgentOutcome::success("never")
        }
    }

    struct FailingAgent {
        config: AgentConfig,
    }

    #[async_trait]
    impl Agent for FailingAgent {
        fn name(&self) -> &str {
            &self.config.name
        }

        fn config(&self) -> &AgentConfig {
            &self.config
        }

        async fn execute(&self, _task: &str, _context: Option<&TaskContext>) -> AgentOutcome {
            AgentOutcome::failure("processing_error", "model unavailable")
        }
    }

    fn executor() -> TaskExecutor {
        TaskExecutor::new(Arc::new(ExecutionLedger::in_memory()))
    }

    fn sample() -> Arc<dyn Agent> {
        Arc::new(SampleAgent::new(AgentConfig::default()).with_delay(Duration::ZERO))
    }

    #[tokio::test]
    async fn test_context_provided_flag() {
        let ex = executor();
        let res = ex.execute(sample(), "Hello World", None).await.unwrap();
        assert!(!res.context_provided);
        assert!(res.context_keys.is_none());
        assert_eq!(res.response.as_deref(), Some("Processed task: Hello World"));
        assert_eq!(res.agent, "sample-agent");
        assert_eq!(res.model, "gpt-4");

        let mut ctx = TaskContext::new();
        ctx.insert("k".into(), serde_json::json!("v"));
        let res = ex.execute(sample(), "Hello", Some(ctx)).await.unwrap();
        assert!(res.context_provided);
        assert_eq!(res.context_keys, Some(vec!["k".to_string()]));
    }

    #[tokio::test]
    async fn test_empty_task_rejected_without_ledger_write() {
        let ex = executor();
        let err = ex.execute(sample(), "   ", None).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidTask(_)));
        assert_eq!(ex.ledger().len().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_task_and_records() {
        let ex = executor();
        let cfg = AgentConfig {
            timeout_seconds: 1,
            ..AgentConfig::default()
        };
        let agent: Arc<dyn Agent> = Arc::new(SleepyAgent { config: cfg });
        let mut task = Task::new("slow work", None);
        let err = ex.execute_task(agent, &mut task).await.unwrap_err();
        assert!(matches!(err, EngineError::ExecutionTimeout { timeout_secs: 1, .. }));
        assert_eq!(task.status, TaskStatus::Failed);

        let history = ex.ledger().list(None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history[0].succeeded());
        assert_eq!(history[0].result.error_kind.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn test_agent_failure_completes_task_with_error_envelope() {
        let ex = executor();
        let agent: Arc<dyn Agent> = Arc::new(FailingAgent {
            config: AgentConfig::default(),
        });
        let mut task = Task::new("do it", None);
        let res = ex.execute_task(agent, &mut task).await.unwrap();
        assert_eq!(res.status, ResultStatus::Error);
        assert_eq!(res.error.as_deref(), Some("model unavailable"));
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(matches!(
            res.into_result(),
            Err(EngineError::AgentInternalError(_))
        ));
        assert_eq!(ex.ledger().len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ledger_count_matches_invocations() {
        let ex = executor();
        let failing: Arc<dyn Agent> = Arc::new(FailingAgent {
            config: AgentConfig::default(),
        });
        for i in 0..6 {
            let agent = if i % 2 == 0 { sample() } else { Arc::clone(&failing) };
            let _ = ex.execute(agent, &format!("task {i}"), None).await;
        }
        assert_eq!(ex.ledger().len().await.unwrap(), 6);
    }

    /// 睡眠 delay 后置位 finished
    struct FlaggedAgent {
        config: AgentConfig,
        delay: Duration,
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Agent for FlaggedAgent {
        fn name(&self) -> &str {
            &self.config.name
        }

        fn config(&self) -> &AgentConfig {
            &self.config
        }

        async fn execute(&self, task: &str, _context: Option<&TaskContext>) -> AgentOutcome {
            tokio::time::sleep(self.delay).await;
            self.finished.store(true, Ordering::SeqCst);
            AgentOutcome::success(format!("done: {task}"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_caller_records_cancellation() {
        let ex = executor();
        let finished = Arc::new(AtomicBool::new(false));
        let agent: Arc<dyn Agent> = Arc::new(FlaggedAgent {
            config: AgentConfig::default(),
            delay: Duration::from_millis(300),
            finished: Arc::clone(&finished),
        });

        // 调用方在 Agent 返回前放弃等待
        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            ex.execute(agent, "abandoned work", None),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!finished.load(Ordering::SeqCst));
        let history = ex.ledger().list(None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].task_description, "abandoned work");
        assert_eq!(history[0].result.error_kind.as_deref(), Some("cancelled"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ledger_order_follows_completion_order() {
        let ex = executor();
        let agent = |ms: u64| -> Arc<dyn Agent> {
            Arc::new(FlaggedAgent {
                config: AgentConfig::default(),
                delay: Duration::from_millis(ms),
                finished: Arc::new(AtomicBool::new(false)),
            })
        };

        // 提交顺序 a, b, c；完成顺序 b(10ms), c(20ms), a(30ms)
        let (a, b, c) = tokio::join!(
            ex.execute(agent(30), "a", None),
            ex.execute(agent(10), "b", None),
            ex.execute(agent(20), "c", None),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());

        let history = ex.ledger().list(None).await.unwrap();
        let order: Vec<&str> = history.iter().map(|r| r.task_description.as_str()).collect();
        assert_eq!(order, vec!["a", "c", "b"]);
        let seqs: Vec<u64> = history.iter().map(|r| r.sequence).collect();
        assert_eq!(seqs, vec![3, 2, 1]);
    }
}
