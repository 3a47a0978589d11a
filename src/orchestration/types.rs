//! 编排类型定义
//!
//! 步骤、步骤状态机、步骤结果与一次编排运行（OrchestrationRun，仅在运行期间存在，不持久化）

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize, Serializer};

use crate::agent::AgentConfigOverride;
use crate::core::{EngineError, ErrorKind, ExecutionResult, TaskContext};

/// 编排中的一个步骤：调用哪个 Agent、执行什么任务
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    /// Agent 名；缺省使用默认 Agent
    #[serde(default)]
    pub agent: Option<String>,
    pub task: String,
    #[serde(default)]
    pub context: Option<TaskContext>,
    #[serde(default)]
    pub agent_config: Option<AgentConfigOverride>,
    /// 链式执行中该步骤的重试次数；缺省不重试
    #[serde(default)]
    pub max_retries: Option<u32>,
}

impl Step {
    pub fn new(name: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            agent: None,
            task: task.into(),
            context: None,
            agent_config: None,
            max_retries: None,
        }
    }

    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn context(mut self, context: TaskContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn agent_config(mut self, over: AgentConfigOverride) -> Self {
        self.agent_config = Some(over);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// 合并 agent 名与配置覆盖；agent 字段优先于覆盖中的 name
    pub fn effective_override(&self) -> Option<AgentConfigOverride> {
        match (&self.agent, &self.agent_config) {
            (None, over) => over.clone(),
            (Some(agent), over) => {
                let mut over = over.clone().unwrap_or_default();
                over.name = Some(agent.clone());
                Some(over)
            }
        }
    }
}

/// 单个步骤的状态：pending → running → {succeeded | failed}；
/// failed → running 只允许在重试算法内发生
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl StepState {
    pub fn can_transition_to(self, next: StepState, retry_allowed: bool) -> bool {
        matches!(
            (self, next),
            (StepState::Pending, StepState::Running)
                | (StepState::Running, StepState::Succeeded)
                | (StepState::Running, StepState::Failed)
        ) || (retry_allowed && self == StepState::Failed && next == StepState::Running)
    }
}

/// 步骤结局：成功值或捕获的错误
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Success(ExecutionResult),
    Failure(EngineError),
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success(_))
    }

    pub fn error(&self) -> Option<&EngineError> {
        match self {
            StepOutcome::Failure(e) => Some(e),
            StepOutcome::Success(_) => None,
        }
    }

    pub fn value(&self) -> Option<&ExecutionResult> {
        match self {
            StepOutcome::Success(v) => Some(v),
            StepOutcome::Failure(_) => None,
        }
    }
}

impl Serialize for StepOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(tag = "status", rename_all = "snake_case")]
        enum Repr<'a> {
            Success { value: &'a ExecutionResult },
            Failure { kind: ErrorKind, message: String },
        }
        match self {
            StepOutcome::Success(value) => Repr::Success { value }.serialize(serializer),
            StepOutcome::Failure(e) => Repr::Failure {
                kind: e.kind(),
                message: e.to_string(),
            }
            .serialize(serializer),
        }
    }
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// 步骤执行结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub step_name: String,
    pub attempt_count: u32,
    pub outcome: StepOutcome,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

impl StepResult {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_success()
    }

    /// 未被调度就被取消的步骤
    pub(crate) fn cancelled(step_name: &str) -> Self {
        Self {
            step_name: step_name.to_string(),
            attempt_count: 0,
            outcome: StepOutcome::Failure(EngineError::Cancelled),
            elapsed: Duration::ZERO,
        }
    }
}

/// 步骤状态跟踪：驱动状态机并累计尝试次数与耗时
pub(crate) struct StepTracker {
    name: String,
    state: StepState,
    attempts: u32,
    retry_allowed: bool,
    started: Instant,
}

impl StepTracker {
    pub fn new(name: &str, retry_allowed: bool) -> Self {
        Self {
            name: name.to_string(),
            state: StepState::Pending,
            attempts: 0,
            retry_allowed,
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> StepState {
        self.state
    }

    /// 进入 running；非法转换返回 false
    pub fn begin_attempt(&mut self) -> bool {
        if !self.state.can_transition_to(StepState::Running, self.retry_allowed) {
            return false;
        }
        self.state = StepState::Running;
        self.attempts += 1;
        true
    }

    pub fn mark_failed(&mut self) {
        if self.state.can_transition_to(StepState::Failed, self.retry_allowed) {
            self.state = StepState::Failed;
        }
    }

    pub fn succeed(mut self, value: ExecutionResult) -> StepResult {
        if self.state.can_transition_to(StepState::Succeeded, self.retry_allowed) {
            self.state = StepState::Succeeded;
        }
        self.finish(StepOutcome::Success(value))
    }

    pub fn fail(mut self, err: EngineError) -> StepResult {
        self.mark_failed();
        self.finish(StepOutcome::Failure(err))
    }

    fn finish(self, outcome: StepOutcome) -> StepResult {
        StepResult {
            step_name: self.name,
            attempt_count: self.attempts,
            outcome,
            elapsed: self.started.elapsed(),
        }
    }
}

/// 编排运行整体状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed,
}

/// 一次编排运行：有序的步骤结果
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationRun {
    pub run_id: String,
    pub status: RunStatus,
    pub steps: Vec<StepResult>,
    /// 链式执行结束时累积的上下文
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_context: Option<TaskContext>,
}

impl OrchestrationRun {
    pub(crate) fn new_id() -> String {
        format!("run_{}", uuid::Uuid::new_v4())
    }

    pub fn from_steps(steps: Vec<StepResult>) -> Self {
        let status = if steps.iter().all(StepResult::succeeded) {
            RunStatus::Succeeded
        } else {
            RunStatus::Failed
        };
        Self {
            run_id: Self::new_id(),
            status,
            steps,
            final_context: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// 第一个失败的步骤
    pub fn failed_step(&self) -> Option<&StepResult> {
        self.steps.iter().find(|s| !s.succeeded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_state_transitions() {
        use StepState::*;
        assert!(Pending.can_transition_to(Running, false));
        assert!(Running.can_transition_to(Succeeded, false));
        assert!(Running.can_transition_to(Failed, false));
        assert!(!Failed.can_transition_to(Running, false));
        assert!(Failed.can_transition_to(Running, true));
        assert!(!Succeeded.can_transition_to(Running, true));
        assert!(!Pending.can_transition_to(Succeeded, true));
    }

    #[test]
    fn test_tracker_without_retry_allows_single_attempt() {
        let mut t = StepTracker::new("s", false);
        assert!(t.begin_attempt());
        t.mark_failed();
        assert_eq!(t.state(), StepState::Failed);
        assert!(!t.begin_attempt());
        let res = t.fail(EngineError::AgentInternalError("x".into()));
        assert_eq!(res.attempt_count, 1);
        assert!(!res.succeeded());
    }

    #[test]
    fn test_step_override_prefers_agent_field() {
        let step = Step::new("s", "t")
            .agent_config(AgentConfigOverride {
                name: Some("a".into()),
                model: Some("m".into()),
                ..Default::default()
            })
            .agent("b");
        let over = step.effective_override().unwrap();
        assert_eq!(over.name.as_deref(), Some("b"));
        assert_eq!(over.model.as_deref(), Some("m"));
        assert!(Step::new("s", "t").effective_override().is_none());
    }

    #[test]
    fn test_failure_outcome_serializes_kind() {
        let res = StepResult::cancelled("x");
        let v = serde_json::to_value(&res).unwrap();
        assert_eq!(v["outcome"]["status"], "failure");
        assert_eq!(v["outcome"]["kind"], "cancelled");
        assert_eq!(v["elapsed_ms"], 0);
    }
}
