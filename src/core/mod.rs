//! 核心类型：错误分类、任务状态机、执行结果信封

pub mod error;
pub mod result;
pub mod task;

pub use error::{EngineError, ErrorKind};
pub use result::{ExecutionResult, ResultStatus};
pub use task::{Task, TaskContext, TaskStatus};
