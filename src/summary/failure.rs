//! Failure taxonomy and stable exit codes

use serde::{Deserialize, Serialize};
use std::fmt;
use testrun_codec::{ParseErrorKind, WriteErrorKind};

/// Per-file status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// File converted and written
    Success,
    /// Reading or writing failed
    Failed,
    /// Stopped before an output was written (interrupt, timeout, aborted merge)
    Cancelled,
}

impl Status {
    /// Check if this is a failure state
    pub fn is_failure(&self) -> bool {
        matches!(self, Status::Failed | Status::Cancelled)
    }
}

/// Failure kind - categorizes why a file did not convert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Input is not a well-formed test-run log
    Malformed,
    /// Two cases collide after parameter disambiguation
    DuplicateCase,
    /// Produced report failed schema validation
    SchemaViolation,
    /// Reading the input or writing the output failed
    IoFailure,
    /// Interrupted, timed out, or dropped with an aborted merge
    Cancelled,
}

impl FailureKind {
    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            FailureKind::Malformed => "Malformed input",
            FailureKind::DuplicateCase => "Duplicate test case",
            FailureKind::SchemaViolation => "Report schema violation",
            FailureKind::IoFailure => "I/O failure",
            FailureKind::Cancelled => "Cancelled",
        }
    }

    /// Stable identifier, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Malformed => "MALFORMED",
            FailureKind::DuplicateCase => "DUPLICATE_CASE",
            FailureKind::SchemaViolation => "SCHEMA_VIOLATION",
            FailureKind::IoFailure => "IO_FAILURE",
            FailureKind::Cancelled => "CANCELLED",
        }
    }

    /// Status a file with this failure ends up in
    pub fn status(&self) -> Status {
        match self {
            FailureKind::Cancelled => Status::Cancelled,
            _ => Status::Failed,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ParseErrorKind> for FailureKind {
    fn from(kind: ParseErrorKind) -> Self {
        match kind {
            ParseErrorKind::Malformed => FailureKind::Malformed,
            ParseErrorKind::DuplicateCase => FailureKind::DuplicateCase,
        }
    }
}

impl From<WriteErrorKind> for FailureKind {
    fn from(kind: WriteErrorKind) -> Self {
        match kind {
            WriteErrorKind::SchemaViolation => FailureKind::SchemaViolation,
            WriteErrorKind::IoFailure => FailureKind::IoFailure,
        }
    }
}

/// Stable process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Every input converted (or nothing matched outside strict mode)
    #[default]
    Success = 0,
    /// One or more files failed or were cancelled
    Failed = 1,
    /// Invalid arguments, configuration, or no matches in strict mode
    Usage = 2,
}

impl ExitCode {
    /// Get the integer value of the exit code
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Create from integer value
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(ExitCode::Success),
            1 => Some(ExitCode::Failed),
            2 => Some(ExitCode::Usage),
            _ => None,
        }
    }

    /// Check if this exit code indicates success
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

/// Helper for aggregating per-file statuses into one exit code
#[derive(Debug, Default)]
pub struct ExitCodeAggregator {
    has_failed: bool,
    has_cancelled: bool,
}

impl ExitCodeAggregator {
    /// Create a new aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file's status to the aggregation
    pub fn add(&mut self, status: Status) {
        match status {
            Status::Failed => self.has_failed = true,
            Status::Cancelled => self.has_cancelled = true,
            Status::Success => {}
        }
    }

    /// Get the aggregated status
    pub fn status(&self) -> Status {
        if self.has_failed {
            Status::Failed
        } else if self.has_cancelled {
            Status::Cancelled
        } else {
            Status::Success
        }
    }

    /// Partial success still reports failure so CI notices
    pub fn exit_code(&self) -> ExitCode {
        if self.status().is_failure() {
            ExitCode::Failed
        } else {
            ExitCode::Success
        }
    }
}
