//! Test metadata
//!
//! Role flags and test attributes carried alongside each registered callable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Attributes of a test method
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDescriptor {
    pub is_test: bool,
    pub run_in_parallel: bool,
    pub enabled: bool,
    pub data_provider: Option<String>,
}

impl TestDescriptor {
    /// Descriptor of an enabled, sequential test without a data provider
    pub fn test() -> Self {
        Self {
            is_test: true,
            run_in_parallel: false,
            enabled: true,
            data_provider: None,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.run_in_parallel = parallel;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn provider(mut self, name: impl Into<String>) -> Self {
        self.data_provider = Some(name.into());
        self
    }
}

impl Default for TestDescriptor {
    fn default() -> Self {
        Self::test()
    }
}

/// Lifecycle role of a hook
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookRole {
    BeforeClass,
    AfterClass,
    BeforeMethod,
    AfterMethod,
}

impl HookRole {
    pub fn all() -> [HookRole; 4] {
        [
            HookRole::BeforeClass,
            HookRole::AfterClass,
            HookRole::BeforeMethod,
            HookRole::AfterMethod,
        ]
    }

    pub fn is_class_level(&self) -> bool {
        matches!(self, HookRole::BeforeClass | HookRole::AfterClass)
    }

    pub fn is_setup(&self) -> bool {
        matches!(self, HookRole::BeforeClass | HookRole::BeforeMethod)
    }
}

impl fmt::Display for HookRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookRole::BeforeClass => write!(f, "before-class"),
            HookRole::AfterClass => write!(f, "after-class"),
            HookRole::BeforeMethod => write!(f, "before-method"),
            HookRole::AfterMethod => write!(f, "after-method"),
        }
    }
}
