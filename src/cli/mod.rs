//! CLI argument parsing
//!
//! Defines command-line interface using clap.

mod commands;

pub use commands::{run_with, Registries};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;
use crate::utils::LogLevel;

/// Suite-driven test orchestration engine
#[derive(Parser, Debug)]
#[command(name = "weaver-exec")]
#[command(version)]
#[command(about = "Run test classes from a JSON or YAML suite description")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a suite
    Run(RunArgs),

    /// List registered classes and their tests
    List(ListArgs),

    /// Print the bundled suite schema
    Schema,

    /// Validate a suite and print its normalised form
    Validate(ValidateArgs),

    /// Show supported environment variables
    Env,
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Suite file (.json, .yaml or .yml)
    pub suite: PathBuf,

    /// JSON schema used to validate the suite
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Disable coloured output
    #[arg(long)]
    pub no_color: bool,

    /// Also write the report to a file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Show test attributes and hooks
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Suite file (.json, .yaml or .yml)
    pub suite: PathBuf,

    /// JSON schema used to validate the suite
    #[arg(short, long)]
    pub schema: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let args = Args::parse_from([
            "weaver-exec",
            "run",
            "suite.yaml",
            "--format",
            "json",
            "--no-color",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.log_level, Some(LogLevel::Debug));
        match args.command {
            Command::Run(run) => {
                assert_eq!(run.suite, PathBuf::from("suite.yaml"));
                assert_eq!(run.format, Some(OutputFormat::Json));
                assert!(run.no_color);
                assert!(run.schema.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_validate_with_schema() {
        let args = Args::parse_from([
            "weaver-exec",
            "--config",
            "cfg.yaml",
            "validate",
            "suite.json",
            "--schema",
            "schema.json",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("cfg.yaml")));
        assert!(matches!(
            args.command,
            Command::Validate(ValidateArgs { schema: Some(_), .. })
        ));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result = Args::try_parse_from(["weaver-exec", "run", "s.json", "--format", "xml"]);
        assert!(result.is_err());
    }
}
