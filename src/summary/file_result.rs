//! Outcome of converting one input file

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use testrun_codec::{ParseError, WriteError};

use super::failure::{FailureKind, Status};

/// Result for a single input, produced by one worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileResult {
    /// Input file
    pub source: PathBuf,

    pub status: Status,

    /// Report the cases ended up in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Number of test cases read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cases: Option<usize>,

    /// Run length from the log's own start/finish times, which can be
    /// shorter than the summed case times when tests ran concurrently
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_duration_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FileResult {
    pub fn success(source: impl Into<PathBuf>, output: impl Into<PathBuf>, cases: usize) -> Self {
        Self {
            source: source.into(),
            status: Status::Success,
            output: Some(output.into()),
            cases: Some(cases),
            run_duration_ms: None,
            failure_kind: None,
            message: None,
        }
    }

    pub fn failed(source: impl Into<PathBuf>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            status: kind.status(),
            output: None,
            cases: None,
            run_duration_ms: None,
            failure_kind: Some(kind),
            message: Some(message.into()),
        }
    }

    pub fn cancelled(source: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::failed(source, FailureKind::Cancelled, message)
    }

    /// Parsed fine, but the merged report it belonged to was never written
    pub fn aborted(source: impl Into<PathBuf>, cases: usize, message: impl Into<String>) -> Self {
        Self {
            cases: Some(cases),
            ..Self::cancelled(source, message)
        }
    }

    pub fn with_run_duration(mut self, duration_ms: u64) -> Self {
        self.run_duration_ms = Some(duration_ms);
        self
    }

    pub fn from_parse_error(source: &Path, error: &ParseError) -> Self {
        Self::failed(
            source,
            error.kind.into(),
            format!("at byte {}: {}", error.offset, error.message),
        )
    }

    pub fn from_write_error(source: &Path, error: &WriteError) -> Self {
        Self::failed(source, error.kind.into(), error.message.clone())
    }

    /// Reading the input failed
    pub fn unreadable(source: &Path, error: &std::io::Error) -> Self {
        Self::failed(
            source,
            FailureKind::IoFailure,
            format!("cannot read {}: {}", source.display(), error),
        )
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_result() {
        let result = FileResult::success("in/a.trx", "out/a.xml", 4);
        assert!(result.is_success());
        assert_eq!(result.cases, Some(4));
        assert_eq!(result.failure_kind, None);
    }

    #[test]
    fn test_parse_error_is_classified() {
        let error = ParseError::duplicate_case(120, "Calc.Adds(1)");
        let result = FileResult::from_parse_error(Path::new("a.trx"), &error);
        assert_eq!(result.status, Status::Failed);
        assert_eq!(result.failure_kind, Some(FailureKind::DuplicateCase));
        assert!(result.message.unwrap().contains("120"));
    }

    #[test]
    fn test_cancelled_result() {
        let result = FileResult::cancelled("a.trx", "interrupted");
        assert_eq!(result.status, Status::Cancelled);
        assert_eq!(result.failure_kind, Some(FailureKind::Cancelled));
    }

    #[test]
    fn test_aborted_result_keeps_case_count() {
        let result = FileResult::aborted("a.trx", 7, "merge aborted");
        assert_eq!(result.status, Status::Cancelled);
        assert_eq!(result.cases, Some(7));
        assert_eq!(result.output, None);
    }

    #[test]
    fn test_run_duration_serialized_when_known() {
        let json = serde_json::to_value(FileResult::success("a.trx", "a.xml", 1).with_run_duration(2_500)).unwrap();
        assert_eq!(json["run_duration_ms"], 2_500);

        let json = serde_json::to_value(FileResult::success("a.trx", "a.xml", 1)).unwrap();
        assert!(json.get("run_duration_ms").is_none());
    }

    #[test]
    fn test_serialization_omits_empty_fields() {
        let json = serde_json::to_value(FileResult::success("a.trx", "a.xml", 1)).unwrap();
        assert_eq!(json["status"], "success");
        assert!(json.get("failure_kind").is_none());

        let json = serde_json::to_value(FileResult::failed("b.trx", FailureKind::Malformed, "bad")).unwrap();
        assert_eq!(json["failure_kind"], "MALFORMED");
        assert!(json.get("output").is_none());
    }
}
