//! trx2junit - convert Visual Studio TRX test logs into JUnit XML
//!
//! The TRX reader, normalizer and JUnit writer live in `testrun-codec`;
//! this crate adds discovery, configuration, output naming, parallel
//! conversion and the run summary.

pub mod config;
pub mod discover;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod signal;
pub mod summary;

pub use config::{ConfigError, ConvertOptions, EffectiveConfig};
pub use pipeline::{run, run_with_cancel, PipelineError, RunOutcome};
pub use summary::{ExitCode, FailureKind, FileResult, RunSummary, Status};
