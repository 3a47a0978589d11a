//! 顺序链
//!
//! 第 N 步的输出上下文合并进第 N+1 步的输入上下文；任一步失败即停止，返回包含失败步骤的部分运行结果。
//! 步骤输出上下文：`{<步骤名>: response, "last_response": response}`，与输入上下文累积传递。

use serde_json::Value;

use crate::core::TaskContext;
use crate::orchestration::fanout::run_once;
use crate::orchestration::retry::{run_with_retry, RetryPolicy};
use crate::orchestration::types::{OrchestrationRun, RunStatus, Step, StepResult};
use crate::orchestration::StepRunner;

pub const LAST_RESPONSE_KEY: &str = "last_response";

/// 步骤声明的上下文 + 上游累积上下文（上游覆盖同名键）
fn merge_context(declared: Option<&TaskContext>, carried: &TaskContext) -> Option<TaskContext> {
    if declared.is_none() && carried.is_empty() {
        return None;
    }
    let mut merged = declared.cloned().unwrap_or_default();
    for (k, v) in carried {
        merged.insert(k.clone(), v.clone());
    }
    Some(merged)
}

fn output_context(result: &StepResult) -> TaskContext {
    let mut out = TaskContext::new();
    if let Some(value) = result.outcome.value() {
        let response = Value::String(value.response.clone().unwrap_or_default());
        out.insert(result.step_name.clone(), response.clone());
        out.insert(LAST_RESPONSE_KEY.to_string(), response);
    }
    out
}

/// 按顺序执行；声明了 max_retries 的步骤使用 retry 策略（其余字段取自 policy）
pub async fn run_chain(
    runner: &dyn StepRunner,
    steps: &[Step],
    initial: Option<TaskContext>,
    policy: &RetryPolicy,
) -> OrchestrationRun {
    let run_id = OrchestrationRun::new_id();
    let mut carried = initial.unwrap_or_default();
    let mut results = Vec::with_capacity(steps.len());
    let mut status = RunStatus::Succeeded;

    for step in steps {
        let mut effective = step.clone();
        effective.context = merge_context(step.context.as_ref(), &carried);

        let result = match step.max_retries {
            Some(n) => run_with_retry(runner, &effective, &policy.clone().with_max_retries(n)).await,
            None => run_once(runner, &effective).await,
        };

        if !result.succeeded() {
            tracing::warn!(run_id = %run_id, step = %step.name, "chain halted on failed step");
            results.push(result);
            status = RunStatus::Failed;
            break;
        }

        if let Some(ctx) = effective.context {
            carried = ctx;
        }
        carried.extend(output_context(&result));
        results.push(result);
    }

    OrchestrationRun {
        run_id,
        status,
        steps: results,
        final_context: Some(carried),
    }
}
