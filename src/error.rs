//! Error types
//!
//! Typed failures surfaced by suite loading, class resolution and hook
//! execution, plus the designated test-failure error raised by assertions.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::HookRole;

/// Suite and schema loading errors
#[derive(Error, Debug)]
pub enum SuiteError {
    #[error("Schema file '{}' not found.", .0.display())]
    SchemaFileNotFound(PathBuf),

    #[error("Invalid JSON in schema file '{}': {message}", .path.display())]
    SchemaParseFailed { path: PathBuf, message: String },

    #[error("Suite file '{}' not found.", .0.display())]
    SuiteFileNotFound(PathBuf),

    #[error("{0}")]
    SuiteParseFailed(String),

    #[error("Suite validation error: {0}")]
    SuiteValidationFailed(String),
}

impl SuiteError {
    /// Short machine-friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            SuiteError::SchemaFileNotFound(_) => "schema_file_not_found",
            SuiteError::SchemaParseFailed { .. } => "schema_parse_failed",
            SuiteError::SuiteFileNotFound(_) => "suite_file_not_found",
            SuiteError::SuiteParseFailed(_) => "suite_parse_failed",
            SuiteError::SuiteValidationFailed(_) => "suite_validation_failed",
        }
    }
}

/// Class lookup errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassResolutionError {
    #[error("Invalid class path '{0}'. Expected a non-empty dotted name")]
    InvalidName(String),

    #[error("Class '{0}' not found in the class registry")]
    NotFound(String),
}

/// Failure raised by a before/after hook
#[derive(Error, Debug, Clone, Serialize)]
#[error("{role} hook '{hook}' of {class_name} failed: {message}")]
pub struct HookError {
    pub class_name: String,
    pub hook: String,
    pub role: HookRole,
    pub message: String,
}

/// Designated assertion failure raised from a test body
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TestFailure(pub String);

impl TestFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_error_kind() {
        let err = SuiteError::SuiteParseFailed("Invalid JSON in suite file".to_string());
        assert_eq!(err.kind(), "suite_parse_failed");
        assert!(err.to_string().contains("Invalid JSON"));
    }

    #[test]
    fn test_hook_error_display() {
        let err = HookError {
            class_name: "pkg.Cls".to_string(),
            hook: "setup".to_string(),
            role: HookRole::BeforeMethod,
            message: "boom".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "before-method hook 'setup' of pkg.Cls failed: boom"
        );
    }
}
