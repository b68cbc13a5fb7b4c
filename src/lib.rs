//! Test Scheduler - parallel test execution engine
//!
//! Runs an ordered list of independent test items, either serially or on a
//! pool of workers, and records a result for every item.
//!
//! ## Features
//!
//! - Sequential and worker-pool execution behind one [`executor::Run`] entry point
//! - Named parallelism groups with optional concurrency bounds
//! - Max-failures threshold and an overall deadline
//! - Items that never complete are reported as `UNRESOLVED`
//! - Shell-command test suites in YAML or JSON
//! - Multiple output formats (Table, JSON, CSV)
//!
//! ## Usage
//!
//! ```bash
//! # Run a suite on 8 workers
//! test-scheduler run suite.yaml -j 8
//!
//! # Stop after the third failure
//! test-scheduler run suite.yaml --max-failures 3
//!
//! # List the tests in a suite
//! test-scheduler list suite.yaml --detailed
//! ```

pub mod cli;
pub mod config;
pub mod executor;
pub mod models;
pub mod output;
pub mod suite;
pub mod utils;
