//! Configuration module
//!
//! Handles loading and managing configuration.

mod env;
mod file;

pub use env::{print_env_help, EnvConfig};
pub use file::ConfigFile;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

/// What the scheduler itself consumes
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Parallelism groups by name. `None` means unlimited.
    #[serde(default)]
    pub parallelism_groups: BTreeMap<String, Option<NonZeroUsize>>,

    /// Stop after this many failed tests
    #[serde(default)]
    pub max_failures: Option<NonZeroUsize>,
}

/// Application configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Number of parallel workers
    pub workers: NonZeroUsize,

    /// Stop after this many failed tests
    pub max_failures: Option<NonZeroUsize>,

    /// Overall time limit for the run in seconds
    pub timeout_secs: Option<u64>,

    /// Time limit for a single test in seconds
    pub per_test_timeout_secs: Option<u64>,

    /// Parallelism groups by name. `null` means unlimited.
    pub parallelism_groups: BTreeMap<String, Option<NonZeroUsize>>,

    /// Run tests in random order
    pub shuffle: bool,

    /// Shell used to run test commands
    pub shell: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_failures: None,
            timeout_secs: None,
            per_test_timeout_secs: None,
            parallelism_groups: BTreeMap::new(),
            shuffle: false,
            shell: "sh".to_string(),
        }
    }
}

fn default_workers() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        let config: Self = if is_yaml_file(path.as_ref()) {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON config")?
        };

        Ok(config)
    }

    /// The part of the configuration the scheduler consumes
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            parallelism_groups: self.parallelism_groups.clone(),
            max_failures: self.max_failures,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn per_test_timeout(&self) -> Option<Duration> {
        self.per_test_timeout_secs.map(Duration::from_secs)
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(workers) = env.workers {
            self.workers = workers;
        }
        if let Some(max_failures) = env.max_failures {
            self.max_failures = Some(max_failures);
        }
        if let Some(timeout) = env.timeout {
            self.timeout_secs = Some(timeout);
        }
        if let Some(shuffle) = env.shuffle {
            self.shuffle = shuffle;
        }
    }
}

/// Check if file is YAML based on extension
pub(crate) fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.workers.get() >= 1);
        assert_eq!(config.max_failures, None);
        assert_eq!(config.shell, "sh");
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_run_config_from_app_config() {
        let mut config = AppConfig::default();
        config.max_failures = NonZeroUsize::new(3);
        config
            .parallelism_groups
            .insert("gpu".to_string(), NonZeroUsize::new(1));

        let run = config.run_config();
        assert_eq!(run.max_failures, NonZeroUsize::new(3));
        assert_eq!(run.parallelism_groups.get("gpu"), Some(&NonZeroUsize::new(1)));
    }

    #[test]
    fn test_load_partial_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "workers: 3\nparallelism_groups:\n  gpu: 1\n  io: null\n",
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.workers.get(), 3);
        assert_eq!(config.parallelism_groups.get("io"), Some(&None));
        assert_eq!(config.shell, "sh");
    }

    #[test]
    fn test_zero_bound_is_rejected() {
        let result: Result<AppConfig, _> =
            serde_yaml::from_str("parallelism_groups:\n  gpu: 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_env() {
        let mut config = AppConfig::default();
        let env = EnvConfig {
            workers: NonZeroUsize::new(7),
            timeout: Some(90),
            ..EnvConfig::default()
        };
        config.apply_env(&env);
        assert_eq!(config.workers.get(), 7);
        assert_eq!(config.timeout(), Some(Duration::from_secs(90)));
    }
}
