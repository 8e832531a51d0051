//! Error types for reading and writing test reports.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a source log could not be turned into a `TestRun`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParseErrorKind {
    /// Not well-formed, truncated, or not a test-run document
    Malformed,
    /// Two cases share a fully-qualified name after disambiguation
    DuplicateCase,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "MALFORMED"),
            Self::DuplicateCase => write!(f, "DUPLICATE_CASE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at byte {offset}: {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Byte offset into the input where the problem was detected
    pub offset: u64,
    pub message: String,
}

impl ParseError {
    pub fn malformed(offset: u64, message: impl Into<String>) -> Self {
        Self {
            kind: ParseErrorKind::Malformed,
            offset,
            message: message.into(),
        }
    }

    pub fn duplicate_case(offset: u64, name: &str) -> Self {
        Self {
            kind: ParseErrorKind::DuplicateCase,
            offset,
            message: format!("test case '{}' appears more than once", name),
        }
    }
}

/// Why a report could not be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteErrorKind {
    /// Produced document does not satisfy the report schema
    SchemaViolation,
    /// Filesystem failure while creating directories or files
    IoFailure,
}

impl fmt::Display for WriteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaViolation => write!(f, "SCHEMA_VIOLATION"),
            Self::IoFailure => write!(f, "IO_FAILURE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct WriteError {
    pub kind: WriteErrorKind,
    pub message: String,
}

impl WriteError {
    pub fn schema_violation(message: impl Into<String>) -> Self {
        Self {
            kind: WriteErrorKind::SchemaViolation,
            message: message.into(),
        }
    }

    pub fn io_failure(message: impl Into<String>) -> Self {
        Self {
            kind: WriteErrorKind::IoFailure,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for WriteError {
    fn from(err: std::io::Error) -> Self {
        Self::io_failure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::malformed(42, "unexpected end of document");
        assert_eq!(err.to_string(), "MALFORMED at byte 42: unexpected end of document");
    }

    #[test]
    fn test_write_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = WriteError::from(io);
        assert_eq!(err.kind, WriteErrorKind::IoFailure);
        assert!(err.message.contains("denied"));
    }
}
