//! Domain model (ids, task specs, results, errors).
//!
//! ここにある型は broker / runner / auditor のどれにも依存しない。

pub mod errors;
pub mod ids;
pub mod outcome;
pub mod task;

pub use errors::ExecutionError;
pub use ids::TaskId;
pub use outcome::{SerializedError, TaskResult, TaskStatus, WorkflowResponse};
pub use task::{SUPPORTED_API_VERSION, TaskSpec, TemplateInfo};
