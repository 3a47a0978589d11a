//! 任务模型与状态机
//!
//! idle → running → {completed | failed}；终态后不可再变。只有 TaskExecutor 推进状态。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 任务上下文：任意 JSON 键值
pub type TaskContext = Map<String, Value>;

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// 一次提交的工作单元
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<TaskContext>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result: Option<Value>,
}

impl Task {
    pub fn new(description: impl Into<String>, context: Option<TaskContext>) -> Self {
        Self {
            id: Some(format!("task_{}", uuid::Uuid::new_v4())),
            description: description.into(),
            context,
            status: TaskStatus::Idle,
            created_at: Utc::now(),
            completed_at: None,
            result: None,
        }
    }

    /// idle → running；其它状态下忽略并返回 false
    pub(crate) fn start(&mut self) -> bool {
        if self.status != TaskStatus::Idle {
            return false;
        }
        self.status = TaskStatus::Running;
        true
    }

    /// running → completed，记录结果
    pub(crate) fn complete(&mut self, result: Value) -> bool {
        self.finish(TaskStatus::Completed, Some(result))
    }

    /// running → failed
    pub(crate) fn fail(&mut self, result: Option<Value>) -> bool {
        self.finish(TaskStatus::Failed, result)
    }

    fn finish(&mut self, status: TaskStatus, result: Option<Value>) -> bool {
        if self.status != TaskStatus::Running {
            return false;
        }
        self.status = status;
        self.completed_at = Some(Utc::now());
        self.result = result;
        true
    }
}
