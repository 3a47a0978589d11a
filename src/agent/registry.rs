//! Agent 注册表
//!
//! 启动时注册一次，之后只读：包进 Arc 后并发 resolve 无需加锁。每次 resolve 都由工厂产出新实例，
//! 实例之间不共享可变状态。

use std::collections::HashMap;
use std::sync::Arc;

use crate::agent::{Agent, AgentConfig};
use crate::core::EngineError;

/// 工厂：给定（已带注册名的）配置产出 Agent 实例
pub type AgentFactory = Arc<dyn Fn(AgentConfig) -> Arc<dyn Agent> + Send + Sync>;

/// 按名称存储工厂，支持 register / resolve / agent_names
#[derive(Default)]
pub struct AgentRegistry {
    factories: HashMap<String, AgentFactory>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工厂；同名已存在时返回 DuplicateAgentName
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), EngineError>
    where
        F: Fn(AgentConfig) -> Arc<dyn Agent> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(EngineError::InvalidConfig("agent name must not be empty".into()));
        }
        if self.factories.contains_key(&name) {
            return Err(EngineError::DuplicateAgentName(name));
        }
        tracing::debug!(agent = %name, "agent registered");
        self.factories.insert(name, Arc::new(factory));
        Ok(())
    }

    /// 按名构造实例；config.name 被改写为注册名
    pub fn resolve(&self, name: &str, config: &AgentConfig) -> Result<Arc<dyn Agent>, EngineError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| EngineError::UnknownAgent(name.to_string()))?;
        let mut cfg = config.clone();
        cfg.name = name.to_string();
        Ok(factory(cfg))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// 已注册名称（排序后返回，便于展示）
    pub fn agent_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}
