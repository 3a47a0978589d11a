//! Agent App 命令行执行器
//!
//! ```bash
//! agent-app "Summarise the release notes"        # 执行单个任务，输出结果信封
//! agent-app --workflow workflows/demo.toml       # 顺序执行工作流，输出 OrchestrationRun
//! agent-app --config my.toml "..."               # 追加配置文件
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use agent_app::config::load_config;
use agent_app::orchestration::{OrchestrationClient, Workflow};
use agent_app::wire::TaskRequest;
use agent_app::{observability, AgentEngine};
use anyhow::{bail, Context};

enum Command {
    Task(String),
    Workflow(PathBuf),
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<(Option<PathBuf>, Command)> {
    let mut config_path = None;
    let mut workflow = None;
    let mut words = Vec::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                config_path = Some(PathBuf::from(args.next().context("--config needs a path")?))
            }
            "--workflow" | "-w" => {
                workflow = Some(PathBuf::from(args.next().context("--workflow needs a path")?))
            }
            _ => words.push(arg),
        }
    }
    let cmd = match workflow {
        Some(path) => Command::Workflow(path),
        None if words.is_empty() => bail!("usage: agent-app [--config FILE] <task...> | --workflow FILE"),
        None => Command::Task(words.join(" ")),
    };
    Ok((config_path, cmd))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config_path, cmd) = parse_args(std::env::args().skip(1))?;
    let cfg = load_config(config_path).context("Failed to load config")?;
    observability::init(&cfg.logging);

    let engine = Arc::new(
        AgentEngine::from_config(&cfg)
            .await
            .context("Failed to create engine")?,
    );

    let output = match cmd {
        Command::Task(task) => {
            let result = engine
                .execute(&TaskRequest::new(task))
                .await
                .context("Task execution failed")?;
            serde_json::to_string_pretty(&result)?
        }
        Command::Workflow(path) => {
            let workflow = Workflow::load(&path)
                .with_context(|| format!("Failed to load workflow {}", path.display()))?;
            let client = OrchestrationClient::from_config(engine, &cfg.orchestration);
            let run = workflow.run(&client).await;
            serde_json::to_string_pretty(&run)?
        }
    };
    println!("{output}");
    Ok(())
}
