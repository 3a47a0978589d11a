//! Agent 配置：进程级默认值 + 单次调用覆盖
//!
//! 覆盖逐字段合并到默认值上（覆盖优先，缺省继承）；合并结果必须满足与默认值相同的边界，越界直接拒绝。

use std::ops::RangeInclusive;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::EngineError;

pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 0.0..=2.0;
pub const MAX_ITERATIONS_RANGE: RangeInclusive<u32> = 1..=100;
pub const TIMEOUT_SECONDS_RANGE: RangeInclusive<u64> = 1..=3600;

/// 不可变的 Agent 配置值对象，可跨并发调用共享
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub model: String,
    pub temperature: f64,
    pub max_iterations: u32,
    pub timeout_seconds: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "sample-agent".to_string(),
            model: "gpt-4".to_string(),
            temperature: 0.7,
            max_iterations: 10,
            timeout_seconds: 300,
        }
    }
}

impl AgentConfig {
    /// 构造并校验
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        temperature: f64,
        max_iterations: u32,
        timeout_seconds: u64,
    ) -> Result<Self, EngineError> {
        let cfg = Self {
            name: name.into(),
            model: model.into(),
            temperature,
            max_iterations,
            timeout_seconds,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.name.trim().is_empty() {
            return Err(EngineError::InvalidConfig("name must not be empty".into()));
        }
        if self.model.trim().is_empty() {
            return Err(EngineError::InvalidConfig("model must not be empty".into()));
        }
        if !TEMPERATURE_RANGE.contains(&self.temperature) {
            return Err(EngineError::InvalidConfig(format!(
                "temperature {} out of range [0.0, 2.0]",
                self.temperature
            )));
        }
        if !MAX_ITERATIONS_RANGE.contains(&self.max_iterations) {
            return Err(EngineError::InvalidConfig(format!(
                "max_iterations {} out of range [1, 100]",
                self.max_iterations
            )));
        }
        if !TIMEOUT_SECONDS_RANGE.contains(&self.timeout_seconds) {
            return Err(EngineError::InvalidConfig(format!(
                "timeout_seconds {} out of range [1, 3600]",
                self.timeout_seconds
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// 逐字段合并覆盖；结果越界时返回 InvalidConfig
    pub fn merge(&self, over: &AgentConfigOverride) -> Result<AgentConfig, EngineError> {
        let merged = AgentConfig {
            name: over.name.clone().unwrap_or_else(|| self.name.clone()),
            model: over.model.clone().unwrap_or_else(|| self.model.clone()),
            temperature: over.temperature.unwrap_or(self.temperature),
            max_iterations: over.max_iterations.unwrap_or(self.max_iterations),
            timeout_seconds: over.timeout_seconds.unwrap_or(self.timeout_seconds),
        };
        merged.validate()?;
        Ok(merged)
    }
}

/// 单次调用的配置覆盖（所有字段可选）
///
/// `timeout` 作为 `timeout_seconds` 的别名接受（兼容旧客户端）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfigOverride {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_iterations: Option<u32>,
    #[serde(default, alias = "timeout")]
    pub timeout_seconds: Option<u64>,
}

impl AgentConfigOverride {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
