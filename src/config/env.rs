//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;
use std::num::NonZeroUsize;

/// Environment variable prefix
const ENV_PREFIX: &str = "TEST_SCHEDULER";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Workers from TEST_SCHEDULER_WORKERS
    pub workers: Option<NonZeroUsize>,
    /// Max failures from TEST_SCHEDULER_MAX_FAILURES
    pub max_failures: Option<NonZeroUsize>,
    /// Timeout from TEST_SCHEDULER_TIMEOUT
    pub timeout: Option<u64>,
    /// Shuffle from TEST_SCHEDULER_SHUFFLE
    pub shuffle: Option<bool>,
    /// Config file from TEST_SCHEDULER_CONFIG
    pub config_file: Option<String>,
    /// Output format from TEST_SCHEDULER_FORMAT
    pub format: Option<String>,
    /// Log filter from TEST_SCHEDULER_LOG
    pub log: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            workers: get_env_parse("WORKERS"),
            max_failures: get_env_parse("MAX_FAILURES"),
            timeout: get_env_parse("TIMEOUT"),
            shuffle: get_env_bool("SHUFFLE"),
            config_file: get_env("CONFIG"),
            format: get_env("FORMAT"),
            log: get_env("LOG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.workers.is_some()
            || self.max_failures.is_some()
            || self.timeout.is_some()
            || self.shuffle.is_some()
            || self.config_file.is_some()
            || self.format.is_some()
            || self.log.is_some()
    }

    /// Get output format with fallback
    pub fn format_or(&self, default: &str) -> String {
        self.format.clone().unwrap_or_else(|| default.to_string())
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_WORKERS:      {:?}", ENV_PREFIX, self.workers);
        println!("  {}_MAX_FAILURES: {:?}", ENV_PREFIX, self.max_failures);
        println!("  {}_TIMEOUT:      {:?}", ENV_PREFIX, self.timeout);
        println!("  {}_SHUFFLE:      {:?}", ENV_PREFIX, self.shuffle);
        println!("  {}_CONFIG:       {:?}", ENV_PREFIX, self.config_file);
        println!("  {}_FORMAT:       {:?}", ENV_PREFIX, self.format);
        println!("  {}_LOG:          {:?}", ENV_PREFIX, self.log);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Print all TEST_SCHEDULER environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_WORKERS       Number of parallel workers");
    println!("  {ENV_PREFIX}_MAX_FAILURES  Stop after this many failed tests");
    println!("  {ENV_PREFIX}_TIMEOUT       Overall time limit in seconds");
    println!("  {ENV_PREFIX}_SHUFFLE       Run tests in random order (true/false)");
    println!("  {ENV_PREFIX}_CONFIG        Path to configuration file");
    println!("  {ENV_PREFIX}_FORMAT        Output format (table, json, csv, summary)");
    println!("  {ENV_PREFIX}_LOG           Log filter (e.g. debug, test_scheduler=trace)");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_WORKERS=8");
    println!("  export {ENV_PREFIX}_MAX_FAILURES=5");
    println!("  test-scheduler run suite.yaml");
}
