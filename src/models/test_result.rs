//! Test result models
//!
//! Defines the per-test result record, its status machine, and the errors
//! captured while running a test.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{HookError, TestFailure};

/// Test execution status
///
/// `Created` is the only non-terminal state. A result moves to one of the
/// terminal states exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    Created,
    Success,
    Failure,
    Skipped,
}

impl TestStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            TestStatus::Created => "·",
            TestStatus::Success => "✓",
            TestStatus::Failure => "✗",
            TestStatus::Skipped => "○",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TestStatus::Created)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TestStatus::Success)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Created => write!(f, "CREATED"),
            TestStatus::Success => write!(f, "SUCCESS"),
            TestStatus::Failure => write!(f, "FAILURE"),
            TestStatus::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// Where a caught error came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// `TestFailure` raised by the test body
    Assertion,
    /// Any other error or panic from the test body
    Unexpected,
    /// A before/after hook failed
    Hook,
    /// Setup of the test itself failed (e.g. its data provider)
    Setup,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Assertion => write!(f, "assertion"),
            FailureKind::Unexpected => write!(f, "unexpected"),
            FailureKind::Hook => write!(f, "hook"),
            FailureKind::Setup => write!(f, "setup"),
        }
    }
}

/// Error captured into a result
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaughtError {
    pub kind: FailureKind,
    pub message: String,
    #[serde(skip)]
    cause: Option<Arc<anyhow::Error>>,
}

impl CaughtError {
    /// Classify an error returned by a test body
    pub fn from_error(error: anyhow::Error) -> Self {
        let kind = if error.downcast_ref::<TestFailure>().is_some() {
            FailureKind::Assertion
        } else {
            FailureKind::Unexpected
        };

        Self {
            kind,
            message: format!("{error:#}"),
            cause: Some(Arc::new(error)),
        }
    }

    pub fn hook(error: &HookError) -> Self {
        Self {
            kind: FailureKind::Hook,
            message: error.to_string(),
            cause: Some(Arc::new(anyhow::Error::new(error.clone()))),
        }
    }

    pub fn setup(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Setup,
            message: message.into(),
            cause: None,
        }
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Unexpected,
            message: format!("panicked: {}", message.into()),
            cause: None,
        }
    }

    /// The underlying error, when one was captured
    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.cause.as_deref()
    }

    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.cause().and_then(|e| e.downcast_ref::<E>())
    }
}

impl PartialEq for CaughtError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message
    }
}

impl fmt::Display for CaughtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Result of a single test execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestResult {
    pub method_name: String,
    pub test_class: String,
    status: TestStatus,
    pub start_time_millis: i64,
    pub end_time_millis: i64,
    pub caught_error: Option<CaughtError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teardown_errors: Vec<CaughtError>,
}

impl TestResult {
    pub fn new(method_name: impl Into<String>, test_class: impl Into<String>) -> Self {
        Self {
            method_name: method_name.into(),
            test_class: test_class.into(),
            status: TestStatus::Created,
            start_time_millis: 0,
            end_time_millis: 0,
            caught_error: None,
            teardown_errors: Vec::new(),
        }
    }

    pub fn status(&self) -> TestStatus {
        self.status
    }

    /// `Class.method` display name
    pub fn name(&self) -> String {
        format!("{}.{}", self.test_class, self.method_name)
    }

    /// Move to a terminal status
    pub fn finish(&mut self, status: TestStatus, error: Option<CaughtError>) {
        debug_assert!(
            !self.status.is_terminal(),
            "result {} already finished as {}",
            self.name(),
            self.status
        );
        debug_assert!(status.is_terminal(), "cannot finish a result as CREATED");
        self.status = status;
        self.caught_error = error;
    }

    /// Adopt the verdict of a result built by the test body itself
    pub fn adopt(&mut self, other: TestResult) {
        if !other.method_name.is_empty() {
            self.method_name = other.method_name;
        }
        if !other.test_class.is_empty() {
            self.test_class = other.test_class;
        }
        let status = if other.status.is_terminal() {
            other.status
        } else {
            TestStatus::Success
        };
        self.finish(status, other.caught_error);
    }

    pub fn duration_ms(&self) -> u64 {
        (self.end_time_millis - self.start_time_millis).max(0) as u64
    }

    /// Build an already-finished SKIPPED result
    pub fn skipped(
        method_name: impl Into<String>,
        test_class: impl Into<String>,
        error: Option<CaughtError>,
    ) -> Self {
        let mut result = Self::new(method_name, test_class);
        result.finish(TestStatus::Skipped, error);
        result
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status.symbol(),
            self.name(),
            self.duration_ms()
        )?;
        if let Some(err) = &self.caught_error {
            write!(f, " - {err}")?;
        }
        Ok(())
    }
}

/// Counts over a set of results
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_duration_ms: u64,
}

impl RunSummary {
    pub fn new<'a>(results: impl IntoIterator<Item = &'a TestResult>) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.total += 1;
            match result.status() {
                TestStatus::Success => summary.passed += 1,
                TestStatus::Failure => summary.failed += 1,
                TestStatus::Skipped => summary.skipped += 1,
                TestStatus::Created => {}
            }
            summary.total_duration_ms += result.duration_ms();
        }
        summary
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    pub fn is_all_passed(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Skip: {} | Pass Rate: {:.1}%",
            self.total,
            self.passed,
            self.failed,
            self.skipped,
            self.pass_rate()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_result_is_created() {
        let result = TestResult::new("test_login", "pkg.LoginTest");
        assert_eq!(result.status(), TestStatus::Created);
        assert_eq!(result.start_time_millis, 0);
        assert_eq!(result.end_time_millis, 0);
        assert!(result.caught_error.is_none());
        assert_eq!(result.name(), "pkg.LoginTest.test_login");
    }

    #[test]
    fn test_finish_sets_terminal_status() {
        let mut result = TestResult::new("m", "C");
        result.finish(TestStatus::Failure, Some(CaughtError::setup("bad row")));
        assert_eq!(result.status(), TestStatus::Failure);
        assert_eq!(result.caught_error.as_ref().unwrap().kind, FailureKind::Setup);
    }

    #[test]
    #[should_panic(expected = "already finished")]
    #[cfg(debug_assertions)]
    fn test_second_transition_is_rejected() {
        let mut result = TestResult::new("m", "C");
        result.finish(TestStatus::Success, None);
        result.finish(TestStatus::Failure, None);
    }

    #[test]
    fn test_caught_error_classification() {
        let assertion = CaughtError::from_error(TestFailure::new("expected 1").into());
        assert_eq!(assertion.kind, FailureKind::Assertion);
        assert_eq!(
            assertion.downcast_ref::<TestFailure>(),
            Some(&TestFailure::new("expected 1"))
        );

        let unexpected = CaughtError::from_error(anyhow::anyhow!("division by zero"));
        assert_eq!(unexpected.kind, FailureKind::Unexpected);
        assert_eq!(unexpected.message, "division by zero");
    }

    #[test]
    fn test_adopt_prebuilt_result() {
        let mut result = TestResult::new("m", "C");
        let mut built = TestResult::new("", "");
        built.finish(TestStatus::Skipped, None);

        result.adopt(built);
        assert_eq!(result.status(), TestStatus::Skipped);
        assert_eq!(result.name(), "C.m");
    }

    #[test]
    fn test_summary() {
        let mut pass = TestResult::new("a", "C");
        pass.finish(TestStatus::Success, None);
        let mut fail = TestResult::new("b", "C");
        fail.finish(TestStatus::Failure, None);
        let skip = TestResult::skipped("c", "C", None);

        let summary = RunSummary::new([&pass, &fail, &skip]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert!(!summary.is_all_passed());
    }
}
