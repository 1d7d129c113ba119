//! Output formatters for run reports
//!
//! Provides table, JSON, CSV and one-line summary output.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::executor::RunReport;
use crate::models::{RunSummary, TestResult, TestStatus};
use crate::utils::format_millis;

/// Output format options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            "csv" => Ok(OutputFormat::Csv),
            "summary" => Ok(OutputFormat::Summary),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::JsonPretty => "json-pretty",
            OutputFormat::Csv => "csv",
            OutputFormat::Summary => "summary",
        };
        write!(f, "{name}")
    }
}

/// Report formatter
pub struct ReportFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ReportFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    pub fn with_color(mut self, colorize: bool) -> Self {
        self.colorize = colorize;
        self
    }

    /// Format a single test result as one line
    pub fn format_result(&self, name: &str, result: &TestResult) -> String {
        let status = self.status_label(result.status());
        let mut line = format!("{:50} {} [{:>6}ms]", name, status, result.duration_ms());
        if let Some(error) = &result.caught_error {
            line.push_str(&format!("\n    {} {}", error.kind, first_line(&error.message)));
        }
        for teardown in &result.teardown_errors {
            line.push_str(&format!("\n    teardown: {}", first_line(&teardown.message)));
        }
        line
    }

    fn status_label(&self, status: TestStatus) -> String {
        let plain = format!("{} {:7}", status.symbol(), status);
        if !self.colorize {
            return plain;
        }
        match status {
            TestStatus::Success => format!("\x1b[32m{plain}\x1b[0m"),
            TestStatus::Failure => format!("\x1b[31m{plain}\x1b[0m"),
            TestStatus::Skipped => format!("\x1b[33m{plain}\x1b[0m"),
            TestStatus::Created => plain,
        }
    }

    /// Format a whole report
    pub fn format_report(&self, report: &RunReport) -> String {
        match self.format {
            OutputFormat::Table => self.format_table(report),
            OutputFormat::Json => serde_json::to_string(report).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Csv => self.format_csv(report).unwrap_or_default(),
            OutputFormat::Summary => self.format_brief(&report.summary(), report.duration_ms()),
        }
    }

    fn format_table(&self, report: &RunReport) -> String {
        let mut output = String::new();

        output.push_str("\n═══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(
            " Test Results ({})\n",
            format_millis(report.started_millis)
        ));
        output.push_str("═══════════════════════════════════════════════════════════════\n");

        for (name, result) in report.sorted() {
            output.push_str(&format!(" {}\n", self.format_result(name, result)));
        }

        if !report.setup_failures.is_empty() {
            output.push_str("\n Setup failures:\n");
            for failure in &report.setup_failures {
                output.push_str(&format!("   - {failure}\n"));
            }
        }

        if !report.hook_failures.is_empty() {
            output.push_str("\n Hook failures:\n");
            for failure in &report.hook_failures {
                output.push_str(&format!("   - {failure}\n"));
            }
        }

        let summary = report.summary();
        let fail_str = if self.colorize && summary.failed > 0 {
            format!("\x1b[31m{}\x1b[0m", summary.failed)
        } else {
            summary.failed.to_string()
        };
        output.push_str(" ───────────────────────────────────────────────────────────\n");
        output.push_str(&format!(
            " Total: {} | Pass: {} | Fail: {} | Skip: {}\n",
            summary.total, summary.passed, fail_str, summary.skipped
        ));
        output.push_str(&format!(
            " Pass Rate: {:.1}% | Duration: {}ms\n",
            summary.pass_rate(),
            report.duration_ms()
        ));

        output
    }

    fn format_csv(&self, report: &RunReport) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            "name",
            "class",
            "method",
            "status",
            "start_millis",
            "end_millis",
            "duration_ms",
            "error_kind",
            "error",
        ])?;

        for (name, result) in report.sorted() {
            let (kind, message) = result
                .caught_error
                .as_ref()
                .map(|e| (e.kind.to_string(), e.message.clone()))
                .unwrap_or_default();
            writer.write_record([
                name.clone(),
                result.test_class.clone(),
                result.method_name.clone(),
                result.status().to_string(),
                result.start_time_millis.to_string(),
                result.end_time_millis.to_string(),
                result.duration_ms().to_string(),
                kind,
                message,
            ])?;
        }

        let bytes = writer.into_inner().context("Failed to flush CSV output")?;
        Ok(String::from_utf8(bytes)?)
    }

    fn format_brief(&self, summary: &RunSummary, duration_ms: u64) -> String {
        format!(
            "{}/{} passed, {} failed, {} skipped ({:.1}%) in {}ms",
            summary.passed,
            summary.total,
            summary.failed,
            summary.skipped,
            summary.pass_rate(),
            duration_ms
        )
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or("")
}

/// Write a report to a file, without colour
pub fn write_report_to_file(path: &Path, report: &RunReport, format: OutputFormat) -> Result<()> {
    let content = ReportFormatter::new(format).no_color().format_report(report);
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}
