//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::num::NonZeroUsize;

/// Parallel test execution scheduler
#[derive(Parser, Debug)]
#[command(name = "test-scheduler")]
#[command(author = "hephaex@gmail.com")]
#[command(version = "0.1.0")]
#[command(about = "Run a suite of independent tests serially or across a worker pool")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the tests in a suite
    Run(RunArgs),

    /// List the tests in a suite
    List(ListArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Suite manifest (YAML or JSON)
    pub suite: String,

    /// Number of parallel workers (1 runs tests serially)
    #[arg(short = 'j', long)]
    pub workers: Option<NonZeroUsize>,

    /// Stop after this many failed tests
    #[arg(long)]
    pub max_failures: Option<NonZeroUsize>,

    /// Overall time limit in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Time limit for each test in seconds
    #[arg(long)]
    pub per_test_timeout: Option<u64>,

    /// Only run tests whose name contains this pattern
    #[arg(long)]
    pub filter: Option<String>,

    /// Run tests in random order
    #[arg(long)]
    pub shuffle: bool,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Save results to file
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Suite manifest (YAML or JSON)
    pub suite: String,

    /// Show group and flags for each test
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write an example configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "./test-scheduler.yaml")]
        output: String,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the active configuration
    Show {
        /// Show environment overrides instead
        #[arg(short, long)]
        env: bool,

        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file (defaults to the first one found)
        file: Option<String>,
    },

    /// Describe the supported environment variables
    Env,
}
