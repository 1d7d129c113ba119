//! Suite model and normaliser
//!
//! Parses and validates a declarative suite description and resolves every
//! inherited setting into concrete per-test configuration.

mod loader;
mod model;
mod normalise;
mod parser;
mod schema;
mod validator;

pub use loader::{is_yaml_file, load_suite_file};
pub use model::{
    ClassConfig, MethodFilter, OneOrMany, ParallelMode, RawClassEntry, RawMethodFilter,
    RawParallel, RawSuiteSettings, RawTestEntry, Suite, SuiteConfig, SuiteDocument, TestConfig,
};
pub use normalise::{normalise, normalise_classes, DEFAULT_PARALLEL, DEFAULT_THREAD_COUNT};
pub use parser::SuiteParser;
pub use schema::bundled_schema;
pub use validator::SuiteValidator;
