//! 集成测试共用的 Agent 与引擎构造

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agent_app::agent::{Agent, AgentConfig, AgentOutcome, AgentRegistry, SampleAgent};
use agent_app::core::TaskContext;
use agent_app::history::ExecutionLedger;
use agent_app::AgentEngine;
use async_trait::async_trait;

/// 固定返回失败
pub struct FailingAgent {
    pub config: AgentConfig,
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
        AgentOutcome::failure("internal", "model backend unavailable")
    }
}

/// 前 n 次调用失败，之后成功；计数跨实例共享
pub struct FlakyAgent {
    pub config: AgentConfig,
    pub remaining_failures: Arc<AtomicU32>,
}

#[async_trait]
impl Agent for FlakyAgent {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn config(&self) -> &AgentConfig {
        &self.config
    }

    async fn execute(&self, task: &str, _context: Option<&TaskContext>) -> AgentOutcome {
        let left = self.remaining_failures.load(Ordering::SeqCst);
        if left > 0 {
            self.remaining_failures.store(left - 1, Ordering::SeqCst);
            return AgentOutcome::failure("internal", "transient failure");
        }
        AgentOutcome::success(format!("Recovered: {task}"))
    }
}

/// 睡眠 delay 后置位 finished，用于确认被取消的调用没有跑完
pub struct TrackedAgent {
    pub config: AgentConfig,
    pub delay: Duration,
    pub finished: Arc<AtomicBool>,
}

#[async_trait]
impl Agent for TrackedAgent {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn config(&self) -> &AgentConfig {
        &self.config
    }

    async fn execute(&self, task: &str, _context: Option<&TaskContext>) -> AgentOutcome {
        tokio::time::sleep(self.delay).await;
        self.finished.store(true, Ordering::SeqCst);
        AgentOutcome::success(format!("Tracked: {task}"))
    }
}

/// 注册 sample-agent（无延迟）、failing、slow（永不返回）与 flaky
pub fn test_engine(flaky_failures: u32) -> AgentEngine {
    engine_with(base_registry(flaky_failures))
}

/// 在基础注册表上额外注册 tracked（延迟 delay）
pub fn test_engine_with_tracked(delay: Duration, finished: Arc<AtomicBool>) -> AgentEngine {
    let mut registry = base_registry(0);
    registry
        .register("tracked", move |config| {
            Arc::new(TrackedAgent {
                config,
                delay,
                finished: Arc::clone(&finished),
            }) as Arc<dyn Agent>
        })
        .unwrap();
    engine_with(registry)
}

fn engine_with(registry: AgentRegistry) -> AgentEngine {
    AgentEngine::new(
        AgentConfig::default(),
        registry,
        Arc::new(ExecutionLedger::in_memory()),
    )
    .unwrap()
}

fn base_registry(flaky_failures: u32) -> AgentRegistry {
    let mut registry = AgentRegistry::new();
    registry
        .register("sample-agent", SampleAgent::factory_with_delay(Duration::ZERO))
        .unwrap();
    registry
        .register("slow", SampleAgent::factory_with_delay(Duration::from_secs(3600)))
        .unwrap();
    registry
        .register("failing", |config| {
            Arc::new(FailingAgent { config }) as Arc<dyn Agent>
        })
        .unwrap();
    let counter = Arc::new(AtomicU32::new(flaky_failures));
    registry
        .register("flaky", move |config| {
            Arc::new(FlakyAgent {
                config,
                remaining_failures: Arc::clone(&counter),
            }) as Arc<dyn Agent>
        })
        .unwrap();
    registry
}
