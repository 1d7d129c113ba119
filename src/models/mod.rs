//! Data models for test orchestration
//!
//! Test metadata, results and their status machine.

mod descriptor;
mod test_result;

pub use descriptor::{HookRole, TestDescriptor};
pub use test_result::{CaughtError, FailureKind, RunSummary, TestResult, TestStatus};
