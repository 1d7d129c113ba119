//! Test execution engine
//!
//! Tasks, the two-lane scheduler and the aggregated run report.

mod report;
mod scheduler;
mod task;

pub use report::{RunReport, SetupFailure, SetupScope};
pub use scheduler::{TestExecutor, DEFAULT_MAX_WORKERS};
pub use task::{TaskAborted, TestTask};
