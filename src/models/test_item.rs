//! Test item model
//!
//! A test item is owned by the caller; the scheduler only ever writes its
//! result slot.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ResultCode, TestResult};

/// What the executor needs to know to run a test. Opaque to the scheduler.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDefinition {
    /// Shell command to run
    #[serde(default)]
    pub command: Option<String>,

    /// The test is expected to fail
    #[serde(default)]
    pub expect_fail: bool,

    /// Skip without running
    #[serde(default)]
    pub skip: bool,

    /// Not supported in this configuration
    #[serde(default)]
    pub unsupported: bool,
}

/// One independent unit of work
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestItem {
    /// Stable identity of the test
    pub path: String,

    /// Parallelism group this test runs under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    #[serde(default, skip_serializing)]
    pub definition: TestDefinition,

    #[serde(default)]
    result: Option<TestResult>,
}

impl TestItem {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            group: None,
            definition: TestDefinition::default(),
            result: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_definition(mut self, definition: TestDefinition) -> Self {
        self.definition = definition;
        self
    }

    pub fn result(&self) -> Option<&TestResult> {
        self.result.as_ref()
    }

    pub fn code(&self) -> Option<ResultCode> {
        self.result.as_ref().map(|r| r.code)
    }

    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }

    /// Attach the result of executing this item.
    ///
    /// # Panics
    ///
    /// If a result was already attached.
    pub fn set_result(&mut self, result: TestResult) {
        assert!(
            self.result.is_none(),
            "result already set for test '{}'",
            self.path
        );
        self.result = Some(result);
    }
}

impl fmt::Display for TestItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Some(result) => write!(f, "{}: {}", result.code, self.path),
            None => write!(f, "{}", self.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_item_builder() {
        let item = TestItem::new("unit/a.test").with_group("gpu");
        assert_eq!(item.path, "unit/a.test");
        assert_eq!(item.group.as_deref(), Some("gpu"));
        assert!(!item.has_result());
    }

    #[test]
    fn test_set_result_once() {
        let mut item = TestItem::new("a");
        item.set_result(TestResult::pass(Duration::from_millis(3)));
        assert_eq!(item.code(), Some(ResultCode::Pass));
        assert_eq!(item.to_string(), "PASS: a");
    }

    #[test]
    #[should_panic(expected = "result already set")]
    fn test_set_result_twice_panics() {
        let mut item = TestItem::new("a");
        item.set_result(TestResult::pass(Duration::ZERO));
        item.set_result(TestResult::unresolved());
    }
}
