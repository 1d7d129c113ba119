//! Suite file loading

use serde_json::Value;
use std::path::Path;
use tracing::debug;

use crate::error::SuiteError;

/// Whether a path has a YAML extension
pub fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
        .unwrap_or(false)
}

fn is_json_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Read a suite file and parse it as JSON or YAML by extension
pub fn load_suite_file(path: &Path) -> Result<Value, SuiteError> {
    if !path.exists() {
        return Err(SuiteError::SuiteFileNotFound(path.to_path_buf()));
    }

    if !is_json_file(path) && !is_yaml_file(path) {
        return Err(SuiteError::SuiteParseFailed(format!(
            "Unsupported file format for '{}'. Use .json or .yaml",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        SuiteError::SuiteParseFailed(format!(
            "Unable to read suite file '{}': {e}",
            path.display()
        ))
    })?;
    debug!("Loaded suite file {} ({} bytes)", path.display(), content.len());

    if is_json_file(path) {
        serde_json::from_str(&content).map_err(|e| {
            SuiteError::SuiteParseFailed(format!(
                "Invalid JSON in suite file '{}': {e} (line {}, column {})",
                path.display(),
                e.line(),
                e.column()
            ))
        })
    } else {
        serde_yaml::from_str(&content).map_err(|e| {
            SuiteError::SuiteParseFailed(format!(
                "Invalid YAML in suite file '{}': {e}",
                path.display()
            ))
        })
    }
}
