//! Suite parser
//!
//! Loads a suite file, validates it against the schema given at construction
//! time and returns the normalised `Suite`.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::loader::load_suite_file;
use super::model::{Suite, SuiteDocument};
use super::schema::bundled_schema;
use super::validator::SuiteValidator;
use crate::error::SuiteError;

pub struct SuiteParser {
    validator: SuiteValidator,
    schema_source: String,
}

impl SuiteParser {
    /// Build a parser from a JSON schema file
    pub fn new(schema_path: impl AsRef<Path>) -> Result<Self, SuiteError> {
        let path = schema_path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| SuiteError::SchemaFileNotFound(path.to_path_buf()))?;

        let schema: Value = serde_json::from_str(&content).map_err(|e| {
            SuiteError::SchemaParseFailed {
                path: path.to_path_buf(),
                message: format!("{e} (line {}, column {})", e.line(), e.column()),
            }
        })?;

        Self::with_schema(&schema, path.display().to_string(), path.to_path_buf())
    }

    /// Build a parser from the schema generated from the suite models
    pub fn bundled() -> Result<Self, SuiteError> {
        Self::with_schema(&bundled_schema(), "bundled".to_string(), PathBuf::from("<bundled>"))
    }

    fn with_schema(schema: &Value, source: String, path: PathBuf) -> Result<Self, SuiteError> {
        let validator = SuiteValidator::new(schema)
            .map_err(|message| SuiteError::SchemaParseFailed { path, message })?;
        debug!("Suite schema loaded from {}", source);
        Ok(Self {
            validator,
            schema_source: source,
        })
    }

    pub fn schema_source(&self) -> &str {
        &self.schema_source
    }

    /// Load, validate and normalise a suite file
    pub fn load_suite(&self, path: impl AsRef<Path>) -> Result<Suite, SuiteError> {
        let path = path.as_ref();
        let value = load_suite_file(path)?;
        let suite = self.parse_value(value)?;
        info!(
            "Loaded suite {} with {} test entries",
            path.display(),
            suite.tests.len()
        );
        Ok(suite)
    }

    /// Validate and normalise an already parsed document
    pub fn parse_value(&self, value: Value) -> Result<Suite, SuiteError> {
        self.validator.validate(&value)?;
        let document: SuiteDocument = serde_json::from_value(value)
            .map_err(|e| SuiteError::SuiteValidationFailed(e.to_string()))?;
        Ok(Suite::from(document))
    }
}
