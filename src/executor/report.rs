//! Aggregated run report

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::error::HookError;
use crate::models::{RunSummary, TestResult, TestStatus};

/// Scope of a setup failure
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupScope {
    /// A class could not be resolved
    Class,
    /// A parameterised method could not be expanded
    Method,
}

/// A configuration problem that kept tests from being built
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SetupFailure {
    pub scope: SetupScope,
    /// Class name, or `Class.method` for method scope
    pub target: String,
    pub message: String,
}

impl fmt::Display for SetupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.message)
    }
}

/// Everything a run produced
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunReport {
    pub results: HashMap<String, TestResult>,
    pub setup_failures: Vec<SetupFailure>,
    pub hook_failures: Vec<HookError>,
    pub started_millis: i64,
    pub finished_millis: i64,
}

impl RunReport {
    pub fn summary(&self) -> RunSummary {
        RunSummary::new(self.results.values())
    }

    /// Whether any test failed or the run could not be set up completely
    pub fn has_failures(&self) -> bool {
        !self.setup_failures.is_empty()
            || self
                .results
                .values()
                .any(|r| r.status() == TestStatus::Failure)
    }

    pub fn get(&self, name: &str) -> Option<&TestResult> {
        self.results.get(name)
    }

    /// Results ordered by task name
    pub fn sorted(&self) -> Vec<(&String, &TestResult)> {
        let mut entries: Vec<_> = self.results.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_millis - self.started_millis).max(0) as u64
    }

    pub fn into_results(self) -> HashMap<String, TestResult> {
        self.results
    }
}
