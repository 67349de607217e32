//! Engine core: the run context, execution records, retry policy and the
//! flow executor.

pub mod context;
pub mod executor;
pub mod record;
pub mod report;
pub mod retry;

pub use context::{RunContext, Selector};
pub use executor::{ExecutorConfig, FailurePolicy, FlowExecutor};
pub use record::{ExecutionRecord, NodeState, SkipCause};
pub use report::{RunReport, RunStatus};
pub use retry::{Backoff, RetryPolicy};
