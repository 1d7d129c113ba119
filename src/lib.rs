//! weaver-exec - suite-driven test orchestration
//!
//! Loads a JSON or YAML suite description, resolves the registered test
//! classes it names and runs their tests through a sequential lane and a
//! bounded parallel lane, reporting one result per test.
//!
//! ## Usage
//!
//! ```no_run
//! use weaver_exec::cli::{run_with, Registries};
//! use weaver_exec::discovery::{ClassRegistry, TestClass};
//! use weaver_exec::models::TestDescriptor;
//!
//! #[tokio::main]
//! async fn main() -> std::process::ExitCode {
//!     let mut classes = ClassRegistry::new();
//!     classes.register("app.SmokeTest", || {
//!         TestClass::builder("app.SmokeTest")
//!             .test("test_ping", TestDescriptor::test(), |_| async { Ok(()) })
//!             .build()
//!     });
//!
//!     run_with(Registries { classes, ..Default::default() }).await
//! }
//! ```

pub mod assertions;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod listener;
pub mod models;
pub mod output;
pub mod samples;
pub mod suite;
pub mod utils;

pub use assertions::{fail_test, Assertions};
pub use discovery::{ClassRegistry, DataProviderRegistry, ListenerRegistry, TestClass};
pub use error::{SuiteError, TestFailure};
pub use executor::{RunReport, TestExecutor};
pub use listener::{ListenerSet, TestListener};
pub use models::{TestDescriptor, TestResult, TestStatus};
pub use suite::{Suite, SuiteParser};
