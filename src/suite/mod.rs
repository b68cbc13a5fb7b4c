//! Test suites
//!
//! A suite is a YAML or JSON manifest listing the tests to run. Each entry
//! becomes one [`TestItem`], in file order.
//!
//! ```yaml
//! tests:
//!   - name: parser/basic
//!     command: ./run-parser-tests basic
//!   - name: gpu/kernels
//!     command: ./gpu-check
//!     group: gpu
//!   - name: known-bug
//!     command: ./repro-1234
//!     expect_fail: true
//! ```

mod shell;

pub use shell::ShellExecutor;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::is_yaml_file;
use crate::models::{TestDefinition, TestItem};

#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("failed to read suite {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse suite {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("test #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("duplicate test name '{0}'")]
    DuplicateName(String),

    #[error("test '{test}' uses undeclared parallelism group '{group}'")]
    UnknownGroup { test: String, group: String },

    #[error("test '{0}' has no command")]
    MissingCommand(String),
}

/// One test entry in a suite manifest
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteEntry {
    pub name: String,

    #[serde(default)]
    pub group: Option<String>,

    #[serde(flatten)]
    pub definition: TestDefinition,
}

/// A list of tests loaded from a manifest
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suite {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub tests: Vec<SuiteEntry>,
}

impl Suite {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SuiteError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SuiteError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let parse_error = |message: String| SuiteError::Parse {
            path: path.to_path_buf(),
            message,
        };

        if is_yaml_file(path) {
            serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))
        } else {
            serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))
        }
    }

    /// Check names are unique, groups are declared, and runnable tests have
    /// a command.
    pub fn validate(
        &self,
        groups: &BTreeMap<String, Option<NonZeroUsize>>,
    ) -> Result<(), SuiteError> {
        let mut seen = HashSet::new();

        for (index, entry) in self.tests.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(SuiteError::EmptyName { index });
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(SuiteError::DuplicateName(entry.name.clone()));
            }
            if let Some(group) = &entry.group {
                if !groups.contains_key(group) {
                    return Err(SuiteError::UnknownGroup {
                        test: entry.name.clone(),
                        group: group.clone(),
                    });
                }
            }

            let definition = &entry.definition;
            let runnable = !definition.skip && !definition.unsupported;
            if runnable && definition.command.is_none() {
                return Err(SuiteError::MissingCommand(entry.name.clone()));
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Keep only tests whose name contains `pattern`.
    pub fn filter(&mut self, pattern: &str) {
        self.tests.retain(|entry| entry.name.contains(pattern));
    }

    pub fn shuffle(&mut self) {
        self.tests.shuffle(&mut rand::rng());
    }

    /// Test items in suite order, without results.
    pub fn items(&self) -> Vec<TestItem> {
        self.tests
            .iter()
            .map(|entry| {
                let item = TestItem::new(entry.name.clone()).with_definition(entry.definition.clone());
                match &entry.group {
                    Some(group) => item.with_group(group.clone()),
                    None => item,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SUITE_YAML: &str = r#"
name: sample
tests:
  - name: a
    command: "true"
  - name: b
    command: "exit 1"
    group: gpu
    expect_fail: true
  - name: c
    skip: true
"#;

    fn groups() -> BTreeMap<String, Option<NonZeroUsize>> {
        let mut groups = BTreeMap::new();
        groups.insert("gpu".to_string(), NonZeroUsize::new(1));
        groups
    }

    fn entry(name: &str) -> SuiteEntry {
        SuiteEntry {
            name: name.to_string(),
            group: None,
            definition: TestDefinition {
                command: Some("true".to_string()),
                ..TestDefinition::default()
            },
        }
    }

    #[test]
    fn test_load_yaml_suite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("suite.yaml");
        std::fs::write(&path, SUITE_YAML).unwrap();

        let suite = Suite::load(&path).unwrap();
        assert_eq!(suite.name.as_deref(), Some("sample"));
        assert_eq!(suite.len(), 3);
        assert!(suite.tests[1].definition.expect_fail);
        assert!(suite.tests[2].definition.skip);
        assert!(suite.validate(&groups()).is_ok());
    }

    #[test]
    fn test_load_json_suite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("suite.json");
        std::fs::write(&path, r#"{"tests": [{"name": "x", "command": "true"}]}"#).unwrap();

        let suite = Suite::load(&path).unwrap();
        assert_eq!(suite.tests[0].definition.command.as_deref(), Some("true"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Suite::load("/nonexistent/suite.yaml").unwrap_err();
        assert!(matches!(err, SuiteError::Io { .. }));
    }

    #[test]
    fn test_items_keep_suite_order() {
        let suite: Suite = serde_yaml::from_str(SUITE_YAML).unwrap();
        let items = suite.items();
        let names: Vec<_> = items.iter().map(|t| t.path.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(items[1].group.as_deref(), Some("gpu"));
        assert!(items.iter().all(|t| !t.has_result()));
    }

    #[test]
    fn test_validate_duplicate_names() {
        let suite = Suite {
            name: None,
            tests: vec![entry("a"), entry("a")],
        };
        assert!(matches!(
            suite.validate(&BTreeMap::new()),
            Err(SuiteError::DuplicateName(name)) if name == "a"
        ));
    }

    #[test]
    fn test_validate_unknown_group() {
        let mut tagged = entry("a");
        tagged.group = Some("network".to_string());
        let suite = Suite {
            name: None,
            tests: vec![tagged],
        };
        assert!(matches!(
            suite.validate(&groups()),
            Err(SuiteError::UnknownGroup { .. })
        ));
    }

    #[test]
    fn test_validate_missing_command() {
        let mut bare = entry("a");
        bare.definition.command = None;
        let suite = Suite {
            name: None,
            tests: vec![bare],
        };
        assert!(matches!(
            suite.validate(&BTreeMap::new()),
            Err(SuiteError::MissingCommand(_))
        ));
    }

    #[test]
    fn test_filter_and_shuffle() {
        let mut suite = Suite {
            name: None,
            tests: vec![entry("parser/a"), entry("lexer/b"), entry("parser/c")],
        };
        suite.filter("parser");
        assert_eq!(suite.len(), 2);

        suite.shuffle();
        let mut names: Vec<_> = suite.tests.iter().map(|e| e.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["parser/a", "parser/c"]);
    }
}
