//! Output formatters for test results
//!
//! Provides Table, JSON, CSV, and summary output formats.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::models::{ResultCode, RunSummary, TestItem};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }

    /// Machine-readable formats keep stdout free of progress lines.
    pub fn shows_progress(self) -> bool {
        matches!(self, OutputFormat::Table | OutputFormat::Summary)
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    path: &'a str,
    group: &'a str,
    code: &'static str,
    elapsed_secs: f64,
    output: &'a str,
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
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

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn paint(&self, code: ResultCode, text: &str) -> String {
        if !self.colorize {
            return text.to_string();
        }
        let color = match code {
            ResultCode::Pass | ResultCode::XFail => "32",
            ResultCode::Fail | ResultCode::XPass | ResultCode::Timeout => "31",
            ResultCode::Skip | ResultCode::Unsupported => "33",
            ResultCode::Unresolved => "35",
        };
        format!("\x1b[{color}m{text}\x1b[0m")
    }

    /// Progress line for a test that just finished, e.g. `PASS: a/b (3 of 10)`
    pub fn format_progress(&self, item: &TestItem, done: usize, total: usize) -> String {
        match item.result() {
            Some(result) => {
                let status = self.paint(result.code, result.code.name());
                match self.format {
                    OutputFormat::Summary => format!(
                        "{} {} ({}ms)",
                        result.code.symbol(),
                        item.path,
                        result.elapsed.as_millis()
                    ),
                    _ => format!("{status}: {} ({done} of {total})", item.path),
                }
            }
            None => format!("{}: {} ({done} of {total})", ResultCode::Unresolved, item.path),
        }
    }

    /// Format the summary of a finished run
    pub fn format_summary(&self, summary: &RunSummary) -> Result<String> {
        match self.format {
            OutputFormat::Table => Ok(self.format_summary_table(summary)),
            OutputFormat::Json => {
                serde_json::to_string(summary).context("Failed to serialize summary")
            }
            OutputFormat::JsonPretty => {
                serde_json::to_string_pretty(summary).context("Failed to serialize summary")
            }
            OutputFormat::Csv => self.format_summary_csv(summary),
            OutputFormat::Summary => Ok(self.format_summary_brief(summary)),
        }
    }

    fn format_summary_table(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        // Failing tests with their output
        let failures: Vec<_> = summary
            .results
            .iter()
            .filter(|t| t.code().map(|c| c.is_failure()).unwrap_or(true))
            .collect();
        for item in &failures {
            let code = item.code().unwrap_or(ResultCode::Unresolved);
            let header = format!("{} {} {}", "*".repeat(20), code, item.path);
            output.push_str(&format!("{}\n", self.paint(code, &header)));
            if let Some(result) = item.result() {
                if !result.output.is_empty() {
                    output.push_str(result.output.trim_end());
                    output.push('\n');
                }
            }
            output.push_str(&format!("{}\n", "*".repeat(20)));
        }

        output.push_str("\n╔══════════════════════════════════════════════════════════════╗\n");
        output.push_str(&format!(
            "║  Test run started {:43} ║\n",
            summary.started_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
        ));
        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        for code in ResultCode::all() {
            let n = summary.count(code);
            if n == 0 {
                continue;
            }
            let label = format!("{:12}", code.name());
            output.push_str(&format!(
                "║  {} {:>8}                                        ║\n",
                self.paint(code, &label),
                n
            ));
        }

        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        output.push_str(&format!(
            "║  Total: {:5} | Testing Time: {:10.2}s                    ║\n",
            summary.total,
            summary.elapsed.as_secs_f64()
        ));
        output.push_str("╚══════════════════════════════════════════════════════════════╝\n");

        output
    }

    fn format_summary_csv(&self, summary: &RunSummary) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for item in &summary.results {
            let (code, elapsed_secs, output) = match item.result() {
                Some(result) => (
                    result.code.name(),
                    result.elapsed.as_secs_f64(),
                    result.output.as_str(),
                ),
                None => (ResultCode::Unresolved.name(), 0.0, ""),
            };
            writer
                .serialize(CsvRow {
                    path: &item.path,
                    group: item.group.as_deref().unwrap_or(""),
                    code,
                    elapsed_secs,
                    output,
                })
                .with_context(|| format!("Failed to write CSV row for {}", item.path))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e.error()))?;
        String::from_utf8(bytes).context("CSV output is not valid UTF-8")
    }

    fn format_summary_brief(&self, summary: &RunSummary) -> String {
        let ok = summary.passed + summary.xfailed;
        let failing: usize = ResultCode::all()
            .iter()
            .filter(|c| c.is_failure())
            .map(|c| summary.count(*c))
            .sum();
        format!(
            "{}/{} ok, {} failing, {} skipped in {:.2}s",
            ok,
            summary.total,
            failing,
            summary.skipped + summary.unsupported,
            summary.elapsed.as_secs_f64()
        )
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// Write results to a file
pub fn write_results_to_file(
    path: impl AsRef<Path>,
    summary: &RunSummary,
    format: OutputFormat,
) -> Result<()> {
    let path = path.as_ref();
    let formatter = ResultFormatter::new(format).no_color();
    let content = formatter.format_summary(summary)?;

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TestResult;
    use chrono::Utc;
    use std::time::Duration;
    use tempfile::tempdir;

    fn item(path: &str, code: ResultCode, output: &str) -> TestItem {
        let mut item = TestItem::new(path);
        item.set_result(TestResult::new(code, output, Duration::from_millis(20)));
        item
    }

    fn summary() -> RunSummary {
        RunSummary::new(
            Utc::now(),
            Duration::from_millis(1500),
            vec![
                item("suite/a", ResultCode::Pass, ""),
                item("suite/b", ResultCode::Fail, "assertion failed, \"x\" != \"y\""),
                item("suite/c", ResultCode::XFail, ""),
                TestItem::new("suite/d"),
            ],
        )
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("TABLE"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::from_str("unknown"), None);
        assert!(!OutputFormat::Csv.shows_progress());
    }

    #[test]
    fn test_formatter_creation() {
        let formatter = ResultFormatter::new(OutputFormat::Json).no_color();
        assert_eq!(formatter.format(), OutputFormat::Json);
        assert!(!formatter.colorize);
    }

    #[test]
    fn test_format_progress() {
        let formatter = ResultFormatter::default().no_color();
        let line = formatter.format_progress(&item("suite/a", ResultCode::Pass, ""), 3, 10);
        assert_eq!(line, "PASS: suite/a (3 of 10)");
    }

    #[test]
    fn test_table_lists_failures_with_output() {
        let formatter = ResultFormatter::default().no_color();
        let output = formatter.format_summary(&summary()).unwrap();
        assert!(output.contains("FAIL suite/b"));
        assert!(output.contains("assertion failed"));
        assert!(output.contains("UNRESOLVED suite/d"));
        assert!(!output.contains("PASS suite/a"));
    }

    #[test]
    fn test_json_summary() {
        let formatter = ResultFormatter::new(OutputFormat::Json);
        let output = formatter.format_summary(&summary()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["total"], 4);
        assert_eq!(value["failed"], 1);
    }

    #[test]
    fn test_csv_summary_quotes_output() {
        let formatter = ResultFormatter::new(OutputFormat::Csv);
        let output = formatter.format_summary(&summary()).unwrap();
        let mut lines = output.lines();
        assert_eq!(lines.next(), Some("path,group,code,elapsed_secs,output"));
        assert!(output.contains("\"assertion failed, \"\"x\"\" != \"\"y\"\"\""));
        assert!(output.contains("suite/d,,UNRESOLVED,0.0,"));
    }

    #[test]
    fn test_brief_summary() {
        let formatter = ResultFormatter::new(OutputFormat::Summary);
        let output = formatter.format_summary(&summary()).unwrap();
        assert_eq!(output, "2/4 ok, 1 failing, 0 skipped in 1.50s");
    }

    #[test]
    fn test_write_results_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        write_results_to_file(&path, &summary(), OutputFormat::JsonPretty).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("suite/b"));
    }
}
