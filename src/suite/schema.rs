//! Bundled suite schema

use serde_json::Value;

use super::model::SuiteDocument;

/// JSON schema describing every suite document the loader accepts
pub fn bundled_schema() -> Value {
    let schema = schemars::schema_for!(SuiteDocument);
    serde_json::to_value(schema).unwrap_or(Value::Bool(true))
}
