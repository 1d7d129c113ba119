//! Suite schema validation

use serde_json::Value;

use crate::error::SuiteError;

/// Compiled suite schema
pub struct SuiteValidator {
    validator: jsonschema::Validator,
}

impl SuiteValidator {
    pub fn new(schema: &Value) -> Result<Self, String> {
        let validator = jsonschema::validator_for(schema).map_err(|e| e.to_string())?;
        Ok(Self { validator })
    }

    /// Check a suite document, reporting the first violation
    pub fn validate(&self, instance: &Value) -> Result<(), SuiteError> {
        let mut errors = self.validator.iter_errors(instance);
        match errors.next() {
            Some(error) => Err(SuiteError::SuiteValidationFailed(error.to_string())),
            None => Ok(()),
        }
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::bundled_schema;
    use serde_json::json;

    #[test]
    fn test_bundled_schema_accepts_minimal_suite() {
        let validator = SuiteValidator::new(&bundled_schema()).unwrap();
        let suite = json!({
            "suite": {"parallel": "none", "thread_count": 1},
            "tests": [{"classes": [{"name": "pkg.Cls"}]}]
        });
        assert!(validator.validate(&suite).is_ok());
    }

    #[test]
    fn test_rejects_bad_documents() {
        let validator = SuiteValidator::new(&bundled_schema()).unwrap();

        let missing_tests = json!({"suite": {}});
        let err = validator.validate(&missing_tests).unwrap_err();
        assert!(err.to_string().starts_with("Suite validation error:"));

        assert!(!validator.is_valid(&json!({"suite": {"thread_count": 0}, "tests": []})));
        assert!(!validator.is_valid(&json!({"suite": {"parallel": "always"}, "tests": []})));
        assert!(!validator.is_valid(&json!({"suite": {}, "tests": [{"classes": []}]})));
    }
}
