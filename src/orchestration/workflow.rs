//! 工作流文件（TOML）
//!
//! ```toml
//! [context]
//! topic = "rust"
//!
//! [[steps]]
//! name = "research"
//! task = "Research the topic"
//! max_retries = 2
//!
//! [[steps]]
//! name = "write"
//! agent = "sample-agent"
//! task = "Write a summary"
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::core::{EngineError, TaskContext};
use crate::orchestration::{OrchestrationClient, OrchestrationRun, Step};

/// 按顺序链执行的工作流定义
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Workflow {
    /// 初始上下文，传给第一步
    #[serde(default)]
    pub context: Option<TaskContext>,
    pub steps: Vec<Step>,
}

impl Workflow {
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        let wf: Workflow =
            toml::from_str(s).map_err(|e| EngineError::InvalidConfig(format!("workflow: {e}")))?;
        if wf.steps.is_empty() {
            return Err(EngineError::InvalidConfig(
                "workflow must declare at least one step".to_string(),
            ));
        }
        Ok(wf)
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub async fn run(&self, client: &OrchestrationClient) -> OrchestrationRun {
        client.chain(&self.steps, self.context.clone()).await
    }
}
