//! Fluent assertions for test bodies
//!
//! Hard assertions return `Err(TestFailure)` at the first failed check, so a
//! body can use `?` on every step. Soft assertions record failures and keep
//! going; `summarise()` turns the collected failures into one `TestFailure`.
//!
//! ```ignore
//! let check = Assertions::hard();
//! check.assert_that(status, "status code").is_equal_to(200)?;
//!
//! let softly = Assertions::soft();
//! softly.assert_that(name.as_str(), "name").starts_with("web")?;
//! softly.assert_that(count, "count").is_greater_than(0)?;
//! softly.summarise()?;
//! ```

use std::fmt::Debug;
use std::sync::Mutex;
use tracing::{debug, error, warn};

use crate::error::TestFailure;

/// Raise the designated test failure from a body
pub fn fail_test(message: impl Into<String>) -> anyhow::Error {
    TestFailure::new(message).into()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Hard,
    Soft,
}

/// Assertion context, hard or soft
#[derive(Debug)]
pub struct Assertions {
    mode: Mode,
    failures: Mutex<Vec<String>>,
}

impl Assertions {
    pub fn hard() -> Self {
        Self {
            mode: Mode::Hard,
            failures: Mutex::new(Vec::new()),
        }
    }

    pub fn soft() -> Self {
        Self {
            mode: Mode::Soft,
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Start an assertion chain over `actual`
    pub fn assert_that<T>(&self, actual: T, description: impl Into<String>) -> AssertValue<'_, T> {
        AssertValue {
            parent: self,
            actual,
            description: description.into(),
        }
    }

    /// Failures recorded so far (soft mode only)
    pub fn failures(&self) -> Vec<String> {
        self.failures
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }

    /// Collapse recorded soft failures into a single `TestFailure`
    pub fn summarise(&self) -> Result<(), TestFailure> {
        let failures = self.failures();
        if failures.is_empty() {
            debug!("All soft assertions passed");
            return Ok(());
        }

        let lines: Vec<String> = failures.iter().map(|msg| format!("  - {msg}")).collect();
        Err(TestFailure::new(format!(
            "Soft assertion failures:\n{}",
            lines.join("\n")
        )))
    }

    fn fail(&self, message: String) -> Result<(), TestFailure> {
        match self.mode {
            Mode::Hard => {
                error!("[Assert] {}", message);
                Err(TestFailure::new(message))
            }
            Mode::Soft => {
                warn!("[Soft] {}", message);
                if let Ok(mut failures) = self.failures.lock() {
                    failures.push(message);
                }
                Ok(())
            }
        }
    }
}

/// One step of a fluent assertion chain
pub struct AssertValue<'a, T> {
    parent: &'a Assertions,
    actual: T,
    description: String,
}

impl<'a, T> AssertValue<'a, T> {
    fn check(self, passed: bool, message: impl FnOnce(&T) -> String) -> Result<Self, TestFailure> {
        if !passed {
            let detail = message(&self.actual);
            let full = format!("{} {}", self.description, detail).trim().to_string();
            self.parent.fail(full)?;
        }
        Ok(self)
    }

    /// Value under test
    pub fn actual(&self) -> &T {
        &self.actual
    }

    /// Custom predicate; `description` replaces the default failure text
    pub fn matches<F>(self, predicate: F, description: Option<&str>) -> Result<Self, TestFailure>
    where
        F: FnOnce(&T) -> bool,
    {
        let passed = predicate(&self.actual);
        let text = description.unwrap_or("custom predicate failed").to_string();
        self.check(passed, move |_| text)
    }
}

impl<'a, T: Debug> AssertValue<'a, T> {
    pub fn is_equal_to<U>(self, expected: U) -> Result<Self, TestFailure>
    where
        T: PartialEq<U>,
        U: Debug,
    {
        let passed = self.actual == expected;
        self.check(passed, |actual| format!("expected {expected:?}, got {actual:?}"))
    }

    pub fn is_not_equal_to<U>(self, unexpected: U) -> Result<Self, TestFailure>
    where
        T: PartialEq<U>,
        U: Debug,
    {
        let passed = self.actual != unexpected;
        self.check(passed, |_| format!("expected not {unexpected:?}, but got it"))
    }

    pub fn is_greater_than<U>(self, value: U) -> Result<Self, TestFailure>
    where
        T: PartialOrd<U>,
        U: Debug,
    {
        let passed = self.actual > value;
        self.check(passed, |actual| format!("expected > {value:?}, got {actual:?}"))
    }

    pub fn is_less_than<U>(self, value: U) -> Result<Self, TestFailure>
    where
        T: PartialOrd<U>,
        U: Debug,
    {
        let passed = self.actual < value;
        self.check(passed, |actual| format!("expected < {value:?}, got {actual:?}"))
    }

    pub fn is_in<U>(self, collection: &[U]) -> Result<Self, TestFailure>
    where
        T: PartialEq<U>,
        U: Debug,
    {
        let passed = collection.iter().any(|item| self.actual == *item);
        self.check(passed, |actual| format!("expected {actual:?} to be in {collection:?}"))
    }
}

impl<'a> AssertValue<'a, bool> {
    pub fn is_true(self) -> Result<Self, TestFailure> {
        let passed = self.actual;
        self.check(passed, |_| "expected true, got false".to_string())
    }

    pub fn is_false(self) -> Result<Self, TestFailure> {
        let passed = !self.actual;
        self.check(passed, |_| "expected false, got true".to_string())
    }
}

impl<'a, U: Debug> AssertValue<'a, Option<U>> {
    pub fn is_some(self) -> Result<Self, TestFailure> {
        let passed = self.actual.is_some();
        self.check(passed, |_| "expected a value, got None".to_string())
    }

    pub fn is_none(self) -> Result<Self, TestFailure> {
        let passed = self.actual.is_none();
        self.check(passed, |actual| format!("expected None, got {actual:?}"))
    }
}

impl<'a, U: PartialEq + Debug> AssertValue<'a, Vec<U>> {
    pub fn contains_item(self, item: U) -> Result<Self, TestFailure> {
        let passed = self.actual.contains(&item);
        self.check(passed, |actual| format!("expected {actual:?} to contain {item:?}"))
    }
}

impl<'a, S: AsRef<str>> AssertValue<'a, S> {
    pub fn contains(self, needle: &str) -> Result<Self, TestFailure> {
        let passed = self.actual.as_ref().contains(needle);
        self.check(passed, |actual| {
            format!("expected '{}' to contain '{needle}'", actual.as_ref())
        })
    }

    pub fn starts_with(self, prefix: &str) -> Result<Self, TestFailure> {
        let passed = self.actual.as_ref().starts_with(prefix);
        self.check(passed, |actual| {
            format!("expected string starting with '{prefix}', got '{}'", actual.as_ref())
        })
    }

    pub fn ends_with(self, suffix: &str) -> Result<Self, TestFailure> {
        let passed = self.actual.as_ref().ends_with(suffix);
        self.check(passed, |actual| {
            format!("expected string ending with '{suffix}', got '{}'", actual.as_ref())
        })
    }
}
