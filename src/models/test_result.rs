//! Test result models
//!
//! Defines result codes, per-test results, and run summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::TestItem;

/// Classification outcome of executing a test item
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultCode {
    Pass,
    Fail,
    /// Expected failure
    XFail,
    /// Unexpected pass of a test marked as expected to fail
    XPass,
    Skip,
    Unsupported,
    Unresolved,
    Timeout,
}

impl ResultCode {
    pub fn name(&self) -> &'static str {
        match self {
            ResultCode::Pass => "PASS",
            ResultCode::Fail => "FAIL",
            ResultCode::XFail => "XFAIL",
            ResultCode::XPass => "XPASS",
            ResultCode::Skip => "SKIP",
            ResultCode::Unsupported => "UNSUPPORTED",
            ResultCode::Unresolved => "UNRESOLVED",
            ResultCode::Timeout => "TIMEOUT",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ResultCode::Pass | ResultCode::XFail => "✓",
            ResultCode::Fail | ResultCode::XPass => "✗",
            ResultCode::Skip | ResultCode::Unsupported => "○",
            ResultCode::Unresolved => "?",
            ResultCode::Timeout => "⏱",
        }
    }

    /// Whether this outcome should make the overall run fail.
    ///
    /// Broader than [`ResultCode::Fail`]: only `Fail` counts toward the
    /// max-failures threshold, but an unexpected pass, a timeout, or a test
    /// that never ran still make the run unsuccessful.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ResultCode::Fail | ResultCode::XPass | ResultCode::Unresolved | ResultCode::Timeout
        )
    }

    pub fn all() -> [ResultCode; 8] {
        [
            ResultCode::Pass,
            ResultCode::Fail,
            ResultCode::XFail,
            ResultCode::XPass,
            ResultCode::Skip,
            ResultCode::Unsupported,
            ResultCode::Unresolved,
            ResultCode::Timeout,
        ]
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a single test execution
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub code: ResultCode,
    pub output: String,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl TestResult {
    pub fn new(code: ResultCode, output: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            code,
            output: output.into(),
            elapsed,
        }
    }

    pub fn pass(elapsed: Duration) -> Self {
        Self::new(ResultCode::Pass, String::new(), elapsed)
    }

    pub fn fail(output: impl Into<String>, elapsed: Duration) -> Self {
        Self::new(ResultCode::Fail, output, elapsed)
    }

    /// Placeholder for a test that never completed execution.
    pub fn unresolved() -> Self {
        Self::new(ResultCode::Unresolved, String::new(), Duration::ZERO)
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.code.symbol(),
            self.code,
            self.elapsed.as_millis()
        )
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Summary of one scheduler run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub xfailed: usize,
    pub xpassed: usize,
    pub skipped: usize,
    pub unsupported: usize,
    pub unresolved: usize,
    pub timed_out: usize,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
    pub results: Vec<TestItem>,
}

impl RunSummary {
    pub fn new(started_at: DateTime<Utc>, elapsed: Duration, results: Vec<TestItem>) -> Self {
        let count = |code: ResultCode| results.iter().filter(|t| t.code() == Some(code)).count();

        Self {
            started_at,
            total: results.len(),
            passed: count(ResultCode::Pass),
            failed: count(ResultCode::Fail),
            xfailed: count(ResultCode::XFail),
            xpassed: count(ResultCode::XPass),
            skipped: count(ResultCode::Skip),
            unsupported: count(ResultCode::Unsupported),
            unresolved: count(ResultCode::Unresolved),
            timed_out: count(ResultCode::Timeout),
            elapsed,
            results,
        }
    }

    pub fn count(&self, code: ResultCode) -> usize {
        match code {
            ResultCode::Pass => self.passed,
            ResultCode::Fail => self.failed,
            ResultCode::XFail => self.xfailed,
            ResultCode::XPass => self.xpassed,
            ResultCode::Skip => self.skipped,
            ResultCode::Unsupported => self.unsupported,
            ResultCode::Unresolved => self.unresolved,
            ResultCode::Timeout => self.timed_out,
        }
    }

    pub fn has_failures(&self) -> bool {
        ResultCode::all()
            .iter()
            .any(|code| code.is_failure() && self.count(*code) > 0)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Testing Time: {:.2}s", self.elapsed.as_secs_f64())?;
        for code in ResultCode::all() {
            let n = self.count(code);
            if n > 0 {
                writeln!(f, "  {:12}: {}", code.name(), n)?;
            }
        }
        write!(f, "  Total       : {}", self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(path: &str, code: ResultCode) -> TestItem {
        let mut item = TestItem::new(path);
        item.set_result(TestResult::new(code, "", Duration::from_millis(5)));
        item
    }

    #[test]
    fn test_only_fail_like_codes_are_failures() {
        assert!(ResultCode::Fail.is_failure());
        assert!(ResultCode::XPass.is_failure());
        assert!(ResultCode::Unresolved.is_failure());
        assert!(!ResultCode::XFail.is_failure());
        assert!(!ResultCode::Skip.is_failure());
    }

    #[test]
    fn test_result_code_serde_names() {
        let json = serde_json::to_string(&ResultCode::XFail).unwrap();
        assert_eq!(json, "\"XFAIL\"");
        let code: ResultCode = serde_json::from_str("\"UNSUPPORTED\"").unwrap();
        assert_eq!(code, ResultCode::Unsupported);
    }

    #[test]
    fn test_unresolved_is_empty() {
        let result = TestResult::unresolved();
        assert_eq!(result.code, ResultCode::Unresolved);
        assert!(result.output.is_empty());
        assert_eq!(result.elapsed, Duration::ZERO);
    }

    #[test]
    fn test_run_summary_counts() {
        let results = vec![
            item("a", ResultCode::Pass),
            item("b", ResultCode::Fail),
            item("c", ResultCode::XFail),
            item("d", ResultCode::Unresolved),
        ];

        let summary = RunSummary::new(Utc::now(), Duration::from_secs(1), results);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.xfailed, 1);
        assert_eq!(summary.unresolved, 1);
        assert!(summary.has_failures());
    }

    #[test]
    fn test_run_summary_without_failures() {
        let results = vec![item("a", ResultCode::Pass), item("b", ResultCode::XFail)];
        let summary = RunSummary::new(Utc::now(), Duration::ZERO, results);
        assert!(!summary.has_failures());
        assert!(summary.to_string().contains("PASS"));
    }

    #[test]
    fn test_result_elapsed_serialized_as_seconds() {
        let result = TestResult::pass(Duration::from_millis(1500));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["elapsed"], serde_json::json!(1.5));
    }
}
