//! 条件路由
//!
//! 判别值 → 步骤的映射；每次恰好分派一个匹配的步骤，无匹配时返回 UnroutedInput，绝不静默跳过。

use std::collections::HashMap;

use crate::core::EngineError;
use crate::orchestration::types::{Step, StepResult};
use crate::orchestration::{fanout::run_once, StepRunner};

#[derive(Debug, Clone, Default)]
pub struct StepRouter {
    routes: HashMap<String, Step>,
}

impl StepRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加路由；同一判别值后注册的覆盖先注册的
    pub fn route(mut self, discriminant: impl Into<String>, step: Step) -> Self {
        self.routes.insert(discriminant.into(), step);
        self
    }

    pub fn select(&self, discriminant: &str) -> Result<&Step, EngineError> {
        self.routes
            .get(discriminant)
            .ok_or_else(|| EngineError::UnroutedInput(discriminant.to_string()))
    }

    pub fn discriminants(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        keys.sort();
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// 按判别值分派并执行一次
pub async fn dispatch(
    runner: &dyn StepRunner,
    router: &StepRouter,
    discriminant: &str,
) -> Result<StepResult, EngineError> {
    let step = router.select(discriminant)?;
    tracing::debug!(discriminant, step = %step.name, "routing step");
    Ok(run_once(runner, step).await)
}
