//! 引擎组件装配
//!
//! AgentEngine 持有默认 AgentConfig、只读 AgentRegistry、TaskExecutor 与执行历史账本，可在多请求间共享；
//! 数据流：配置合并 → 注册表解析 → 受限执行 → 账本追加 → 返回信封。

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::{AgentConfig, AgentRegistry, SampleAgent};
use crate::config::{AppConfig, HistoryBackend, HistorySection};
use crate::core::{EngineError, ExecutionResult};
use crate::executor::TaskExecutor;
use crate::history::{
    ExecutionLedger, ExecutionRecord, HistoryStore, InMemoryHistoryStore, SqliteHistoryStore,
};
use crate::orchestration::{Step, StepRunner};
use crate::wire::TaskRequest;

pub struct AgentEngine {
    default_config: AgentConfig,
    registry: Arc<AgentRegistry>,
    executor: TaskExecutor,
}

/// 内置 Agent 的注册表
pub fn default_registry() -> Result<AgentRegistry, EngineError> {
    let mut registry = AgentRegistry::new();
    registry.register("sample-agent", SampleAgent::factory())?;
    Ok(registry)
}

/// 按 [history] 段创建存储
pub fn create_history_store(cfg: &HistorySection) -> Result<Arc<dyn HistoryStore>, EngineError> {
    Ok(match cfg.backend {
        HistoryBackend::Memory => match cfg.capacity {
            Some(cap) => Arc::new(InMemoryHistoryStore::bounded(cap)),
            None => Arc::new(InMemoryHistoryStore::unbounded()),
        },
        HistoryBackend::Sqlite => Arc::new(SqliteHistoryStore::open(&cfg.sqlite_path)?),
    })
}

impl AgentEngine {
    /// 默认 Agent 必须已注册
    pub fn new(
        default_config: AgentConfig,
        registry: AgentRegistry,
        ledger: Arc<ExecutionLedger>,
    ) -> Result<Self, EngineError> {
        default_config.validate()?;
        if !registry.contains(&default_config.name) {
            return Err(EngineError::UnknownAgent(default_config.name.clone()));
        }
        Ok(Self {
            default_config,
            registry: Arc::new(registry),
            executor: TaskExecutor::new(ledger),
        })
    }

    /// 从应用配置装配：内置注册表 + 配置的历史后端
    pub async fn from_config(cfg: &AppConfig) -> Result<Self, EngineError> {
        let default_config = cfg.agent.to_agent_config()?;
        let store = create_history_store(&cfg.history)?;
        let ledger = Arc::new(ExecutionLedger::resume(store).await?);
        tracing::info!(
            agent = %default_config.name,
            model = %default_config.model,
            backend = ?cfg.history.backend,
            "agent engine ready"
        );
        Self::new(default_config, default_registry()?, ledger)
    }

    pub fn default_config(&self) -> &AgentConfig {
        &self.default_config
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn ledger(&self) -> &Arc<ExecutionLedger> {
        self.executor.ledger()
    }

    /// 执行一次请求；校验、合并与解析失败都发生在调用 Agent 之前，不写账本
    pub async fn execute(&self, req: &TaskRequest) -> Result<ExecutionResult, EngineError> {
        if req.task.trim().is_empty() {
            return Err(EngineError::InvalidTask(
                "task description must not be empty".to_string(),
            ));
        }
        let cfg = match &req.agent_config {
            Some(over) => self.default_config.merge(over)?,
            None => self.default_config.clone(),
        };
        let agent = self.registry.resolve(&cfg.name, &cfg)?;
        self.executor
            .execute(agent, &req.task, req.context.clone())
            .await
    }

    pub async fn history(&self, limit: Option<usize>) -> Result<Vec<ExecutionRecord>, EngineError> {
        self.ledger().list(limit).await
    }
}

#[async_trait]
impl StepRunner for AgentEngine {
    async fn run_step(&self, step: &Step) -> Result<ExecutionResult, EngineError> {
        let req = TaskRequest {
            task: step.task.clone(),
            context: step.context.clone(),
            agent_config: step.effective_override(),
        };
        self.execute(&req).await?.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentConfigOverride;
    use std::time::Duration;

    fn engine() -> AgentEngine {
        let mut registry = AgentRegistry::new();
        registry
            .register("sample-agent", SampleAgent::factory_with_delay(Duration::ZERO))
            .unwrap();
        AgentEngine::new(
            AgentConfig::default(),
            registry,
            Arc::new(ExecutionLedger::in_memory()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_execute_with_override() {
        let e = engine();
        let req = TaskRequest::new("Hello").with_config(AgentConfigOverride {
            model: Some("gpt-4o".into()),
            ..Default::default()
        });
        let res = e.execute(&req).await.unwrap();
        assert_eq!(res.model, "gpt-4o");
        assert_eq!(e.default_config().model, "gpt-4");
        assert_eq!(e.history(None).await.unwrap()[0].model, "gpt-4o");
    }

    #[tokio::test]
    async fn test_caller_errors_skip_ledger() {
        let e = engine();
        let unknown = TaskRequest::new("Hello").with_config(AgentConfigOverride {
            name: Some("missing-agent".into()),
            ..Default::default()
        });
        assert_eq!(
            e.execute(&unknown).await.unwrap_err(),
            EngineError::UnknownAgent("missing-agent".into())
        );
        let bad = TaskRequest::new("Hello").with_config(AgentConfigOverride {
            temperature: Some(9.0),
            ..Default::default()
        });
        assert!(matches!(
            e.execute(&bad).await.unwrap_err(),
            EngineError::InvalidConfig(_)
        ));
        assert!(matches!(
            e.execute(&TaskRequest::new("")).await.unwrap_err(),
            EngineError::InvalidTask(_)
        ));
        assert_eq!(e.ledger().len().await.unwrap(), 0);
    }

    #[test]
    fn test_unregistered_default_agent_rejected() {
        let cfg = AgentConfig {
            name: "ghost".into(),
            ..AgentConfig::default()
        };
        let res = AgentEngine::new(cfg, AgentRegistry::new(), Arc::new(ExecutionLedger::in_memory()));
        assert!(matches!(res, Err(EngineError::UnknownAgent(_))));
    }
}
