//! Suite document models
//!
//! `SuiteDocument` mirrors the file format as written, with every optional
//! field left optional. `Suite` is the normalised form the executor consumes:
//! every parallel mode and thread count is concrete.

use glob::Pattern;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the tests of an entry are spread over the lanes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ParallelMode {
    /// Only tests marked parallel use the parallel lane
    #[default]
    None,
    /// Whole test entries run concurrently with each other
    Tests,
    /// Classes of an entry run concurrently with each other
    Classes,
    /// Every test method of an entry uses the parallel lane
    Methods,
}

impl fmt::Display for ParallelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParallelMode::None => write!(f, "none"),
            ParallelMode::Tests => write!(f, "tests"),
            ParallelMode::Classes => write!(f, "classes"),
            ParallelMode::Methods => write!(f, "methods"),
        }
    }
}

/// `parallel` as written: a mode name or a boolean
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawParallel {
    Flag(bool),
    Mode(ParallelMode),
}

impl RawParallel {
    pub fn mode(self) -> ParallelMode {
        match self {
            RawParallel::Flag(true) => ParallelMode::Methods,
            RawParallel::Flag(false) => ParallelMode::None,
            RawParallel::Mode(mode) => mode,
        }
    }
}

/// A single string or a list of strings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

/// Top-level suite file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "Test suite")]
pub struct SuiteDocument {
    pub suite: RawSuiteSettings,
    pub tests: Vec<RawTestEntry>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawSuiteSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel: Option<RawParallel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1))]
    pub thread_count: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawTestEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[schemars(length(min = 1))]
    pub classes: Vec<RawClassEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel: Option<RawParallel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1))]
    pub thread_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// A class reference: a bare dotted name or a name with method filters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawClassEntry {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        methods: Option<RawMethodFilter>,
    },
}

impl RawClassEntry {
    pub fn name(&self) -> &str {
        match self {
            RawClassEntry::Name(name) => name,
            RawClassEntry::Detailed { name, .. } => name,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RawMethodFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<OneOrMany>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<OneOrMany>,
}

/// Normalised suite
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Suite {
    pub settings: SuiteConfig,
    pub tests: Vec<TestConfig>,
}

/// Suite-level defaults
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SuiteConfig {
    pub name: Option<String>,
    pub parallel: ParallelMode,
    pub thread_count: usize,
}

/// One test entry with every inherited field resolved
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TestConfig {
    pub name: String,
    pub classes: Vec<ClassConfig>,
    pub parallel: ParallelMode,
    pub thread_count: usize,
    pub enabled: bool,
}

impl TestConfig {
    pub fn is_parallel(&self) -> bool {
        self.parallel != ParallelMode::None
    }

    pub fn class_names(&self) -> Vec<&str> {
        self.classes.iter().map(|c| c.name.as_str()).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassConfig {
    pub name: String,
    pub methods: MethodFilter,
}

impl ClassConfig {
    pub fn all_methods(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: MethodFilter::default(),
        }
    }
}

/// Include/exclude glob patterns over method names
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MethodFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl MethodFilter {
    /// Whether `method` passes the filter. An empty include list selects all.
    pub fn selects(&self, method: &str) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|p| pattern_matches(p, method));
        included && !self.exclude.iter().any(|p| pattern_matches(p, method))
    }
}

fn pattern_matches(pattern: &str, name: &str) -> bool {
    match Pattern::new(pattern) {
        Ok(compiled) => compiled.matches(name),
        Err(_) => pattern == name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_parallel_accepts_bool_and_mode() {
        let flag: RawParallel = serde_json::from_str("true").unwrap();
        assert_eq!(flag.mode(), ParallelMode::Methods);

        let mode: RawParallel = serde_json::from_str("\"classes\"").unwrap();
        assert_eq!(mode.mode(), ParallelMode::Classes);

        assert!(serde_json::from_str::<RawParallel>("\"sometimes\"").is_err());
    }

    #[test]
    fn test_class_entry_forms() {
        let entries: Vec<RawClassEntry> = serde_json::from_str(
            r#"["pkg.A", {"name": "pkg.B", "methods": {"include": "test_*"}}]"#,
        )
        .unwrap();

        assert_eq!(entries[0], RawClassEntry::Name("pkg.A".to_string()));
        assert_eq!(entries[1].name(), "pkg.B");
    }

    #[test]
    fn test_method_filter() {
        let filter = MethodFilter {
            include: vec!["test_login*".to_string()],
            exclude: vec!["*_slow".to_string()],
        };
        assert!(filter.selects("test_login_ok"));
        assert!(!filter.selects("test_login_slow"));
        assert!(!filter.selects("test_logout"));
        assert!(MethodFilter::default().selects("anything"));
    }

    #[test]
    fn test_invalid_pattern_matches_literally() {
        let filter = MethodFilter {
            include: vec!["test[".to_string()],
            exclude: vec![],
        };
        assert!(filter.selects("test["));
        assert!(!filter.selects("test_a"));
    }
}
