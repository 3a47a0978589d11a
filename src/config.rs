//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `AGENT_APP__*` 覆盖（双下划线表示嵌套，如 `AGENT_APP__AGENT__MODEL=gpt-4o`）。
//! 进程启动时读取一次，`[agent]` 段转换为默认 AgentConfig 后按参数传给各组件。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::agent::AgentConfig;
use crate::core::EngineError;
use crate::orchestration::{Jitter, RetryPolicy};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub agent: AgentSection,
    pub history: HistorySection,
    pub orchestration: OrchestrationSection,
    pub logging: LoggingSection,
}

/// [app] 段：应用名、运行环境、监听地址
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    pub environment: String,
    pub debug: bool,
    pub host: String,
    pub port: u16,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "ai-agent-app".to_string(),
            environment: "development".to_string(),
            debug: true,
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// [agent] 段：默认 Agent 配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub name: String,
    pub model: String,
    pub temperature: f64,
    pub max_iterations: u32,
    pub timeout_seconds: u64,
}

impl Default for AgentSection {
    fn default() -> Self {
        let d = AgentConfig::default();
        Self {
            name: d.name,
            model: d.model,
            temperature: d.temperature,
            max_iterations: d.max_iterations,
            timeout_seconds: d.timeout_seconds,
        }
    }
}

impl AgentSection {
    /// 转为默认 AgentConfig；越界值视为启动错误
    pub fn to_agent_config(&self) -> Result<AgentConfig, EngineError> {
        AgentConfig::new(
            self.name.clone(),
            self.model.clone(),
            self.temperature,
            self.max_iterations,
            self.timeout_seconds,
        )
    }
}

/// 历史存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    #[default]
    Memory,
    Sqlite,
}

/// [history] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistorySection {
    pub backend: HistoryBackend,
    /// 内存后端的最大保留条数，未设置则不限
    pub capacity: Option<usize>,
    pub sqlite_path: PathBuf,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            backend: HistoryBackend::Memory,
            capacity: None,
            sqlite_path: PathBuf::from("data/history.db"),
        }
    }
}

/// [orchestration] 段：重试、退避、并发与 HTTP 步骤执行器
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestrationSection {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: Jitter,
    pub concurrency: usize,
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for OrchestrationSection {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter: Jitter::None,
            concurrency: 4,
            base_url: "http://127.0.0.1:8000".to_string(),
            // 略大于 Agent 最长默认超时
            request_timeout_secs: 330,
        }
    }
}

impl OrchestrationSection {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            jitter: self.jitter,
        }
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// [logging] 段；RUST_LOG 存在时优先
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// 环境变量前缀：`AGENT_APP__AGENT__MODEL=gpt-4o` 覆盖 `[agent].model`
pub const ENV_PREFIX: &str = "AGENT_APP";

/// 默认配置文件候选（相对当前目录），取第一个存在的
const DEFAULT_CONFIG_FILES: [&str; 3] = [
    "config/default.toml",
    "../config/default.toml",
    "default.toml",
];

fn default_config_file() -> Option<&'static Path> {
    DEFAULT_CONFIG_FILES
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
}

/// 加载 AppConfig，来源按优先级由低到高叠加：
/// 各段内置默认值 → 默认配置文件 → `config_path`（必须存在）→ `AGENT_APP__*` 环境变量
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = default_config_file() {
        tracing::debug!(path = %path.display(), "default config file found");
        builder = builder.add_source(config::File::from(path));
    }
    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }
    builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

/// 重新从磁盘与环境变量加载配置（配置热更新：调用方决定是否用新配置重建引擎）
pub fn reload_config() -> Result<AppConfig, config::ConfigError> {
    load_config(None)
}
