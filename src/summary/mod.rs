//! Per-file results, run summary and exit-code aggregation

mod failure;
mod file_result;
mod run_summary;

pub use failure::{ExitCode, ExitCodeAggregator, FailureKind, Status};
pub use file_result::FileResult;
pub use run_summary::{RunSummary, RUN_SUMMARY_SCHEMA_ID, RUN_SUMMARY_SCHEMA_VERSION};
