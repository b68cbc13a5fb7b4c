//! Data models for test scheduling
//!
//! Test items, result codes, results, and run summaries.

mod test_item;
mod test_result;

pub use test_item::{TestDefinition, TestItem};
pub use test_result::{ResultCode, RunSummary, TestResult};
