//! weaver-exec - run a test suite against the bundled sample classes
//!
//! ```bash
//! # Run a suite
//! weaver-exec run suites/sample_suite.yaml
//!
//! # Machine-readable report
//! weaver-exec run suites/sample_suite.json --format json-pretty --output report.json
//!
//! # Inspect
//! weaver-exec list --detailed
//! weaver-exec validate suites/sample_suite.yaml
//! weaver-exec schema
//! ```

use std::process::ExitCode;

use weaver_exec::cli::run_with;
use weaver_exec::samples;

#[tokio::main]
async fn main() -> ExitCode {
    run_with(samples::registries()).await
}
