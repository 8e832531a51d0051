//! Test-run codec
//!
//! Reads Visual Studio TRX logs into a canonical test-run model,
//! normalizes outcomes and failure details, and writes JUnit XML reports.

pub mod error;
pub mod junit;
pub mod model;
pub mod normalize;
pub mod report;
pub mod trx;

pub use error::{ParseError, ParseErrorKind, WriteError, WriteErrorKind};
pub use junit::{to_junit_xml, validate_junit, JunitSummary};
pub use model::{Counts, FailureDetail, Outcome, TestCase, TestRun};
pub use normalize::{normalize, NormalizeOptions, DEFAULT_MAX_DETAIL_LENGTH};
pub use report::{Report, Suite, SuiteGrouping};
