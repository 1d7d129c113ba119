//! Command handlers
//!
//! Test classes are compiled in, so a binary hands its registries to
//! `run_with` and gets the whole command line for free.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use super::{Args, Command, ListArgs, RunArgs, ValidateArgs};
use crate::config::{print_env_help, EnvConfig, ExecutorConfig};
use crate::discovery::{ClassRegistry, DataProviderRegistry, ListenerRegistry};
use crate::executor::TestExecutor;
use crate::models::HookRole;
use crate::output::{write_report_to_file, OutputFormat, ReportFormatter};
use crate::suite::{bundled_schema, SuiteParser};
use crate::utils::init_logger;

/// Everything registered by the embedding binary
#[derive(Clone, Default)]
pub struct Registries {
    pub classes: ClassRegistry,
    pub listeners: ListenerRegistry,
    pub providers: DataProviderRegistry,
}

/// Parse the process arguments and run the selected command
pub async fn run_with(registries: Registries) -> ExitCode {
    let args = Args::parse();
    match execute(args, registries).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Run a parsed command; returns the process exit code
pub async fn execute(args: Args, registries: Registries) -> Result<u8> {
    let env = EnvConfig::load();
    let mut config = ExecutorConfig::resolve(args.config.as_deref(), &env)?;
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    init_logger(config.log_level);

    match args.command {
        Command::Run(run_args) => run_suite(run_args, &config, registries).await,
        Command::List(list_args) => {
            list_classes(list_args, &registries.classes);
            Ok(0)
        }
        Command::Schema => {
            let schema = serde_json::to_string_pretty(&bundled_schema())?;
            println!("{schema}");
            Ok(0)
        }
        Command::Validate(validate_args) => validate_suite(validate_args, &config),
        Command::Env => {
            print_env_help();
            Ok(0)
        }
    }
}

fn suite_parser(explicit: Option<&Path>, config: &ExecutorConfig) -> Result<SuiteParser> {
    let parser = match explicit.or(config.schema_path.as_deref()) {
        Some(path) => SuiteParser::new(path)?,
        None => SuiteParser::bundled()?,
    };
    Ok(parser)
}

async fn run_suite(args: RunArgs, config: &ExecutorConfig, registries: Registries) -> Result<u8> {
    let parser = suite_parser(args.schema.as_deref(), config)?;
    let suite = parser.load_suite(&args.suite)?;

    info!(
        "Running suite {} ({} test entries, schema: {})",
        args.suite.display(),
        suite.tests.len(),
        parser.schema_source()
    );

    let executor = TestExecutor::new(Arc::new(registries.classes))
        .with_providers(Arc::new(registries.providers))
        .with_listeners(registries.listeners.discover())
        .with_max_workers(config.max_workers);

    let report = executor.run_tests(&suite).await;

    let format = args.format.unwrap_or(config.format);
    let formatter = ReportFormatter::new(format).with_color(config.colorize && !args.no_color);
    println!("{}", formatter.format_report(&report));

    if let Some(path) = &args.output {
        let file_format = format_for_path(path, format);
        write_report_to_file(path, &report, file_format)?;
        info!("Report written to {}", path.display());
    }

    Ok(if report.has_failures() { 1 } else { 0 })
}

/// Pick the file format from the extension, falling back to the console format
fn format_for_path(path: &Path, fallback: OutputFormat) -> OutputFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => OutputFormat::JsonPretty,
        Some("csv") => OutputFormat::Csv,
        Some("txt") => OutputFormat::Table,
        _ => fallback,
    }
}

fn validate_suite(args: ValidateArgs, config: &ExecutorConfig) -> Result<u8> {
    let parser = suite_parser(args.schema.as_deref(), config)?;
    let suite = parser
        .load_suite(&args.suite)
        .with_context(|| format!("Suite {} is not valid", args.suite.display()))?;

    println!("{}", serde_json::to_string_pretty(&suite)?);
    Ok(0)
}

fn list_classes(args: ListArgs, classes: &ClassRegistry) {
    println!("\nRegistered Test Classes ({} total)\n", classes.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for name in classes.names() {
        let class = match classes.resolve(name) {
            Ok(class) => class,
            Err(e) => {
                println!("\n{name}: {e}");
                continue;
            }
        };

        println!("\n{name}");
        println!("──────────────────────────────────────────────────────────────────────");
        for test in class.tests() {
            if args.detailed {
                let descriptor = test.descriptor();
                let mut flags = Vec::new();
                if descriptor.run_in_parallel {
                    flags.push("parallel".to_string());
                }
                if !descriptor.enabled {
                    flags.push("disabled".to_string());
                }
                if let Some(provider) = &descriptor.data_provider {
                    flags.push(format!("provider={provider}"));
                }
                println!("  - {:30} [{}]", test.name(), flags.join(", "));
            } else {
                println!("  - {}", test.name());
            }
        }

        if args.detailed {
            for role in HookRole::all() {
                let hooks = class.hooks().get(role);
                if !hooks.is_empty() {
                    let names: Vec<_> = hooks.iter().map(|h| h.name()).collect();
                    println!("    {role}: {}", names.join(", "));
                }
            }
        }
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
}
