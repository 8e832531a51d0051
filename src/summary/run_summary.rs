//! End-of-run summary
//!
//! Rendered to stderr for humans and optionally written as JSON for CI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::failure::{ExitCodeAggregator, Status};
use super::file_result::FileResult;
use crate::output::WrittenFile;

/// Schema version for the summary JSON
pub const RUN_SUMMARY_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for the summary JSON
pub const RUN_SUMMARY_SCHEMA_ID: &str = "trx2junit/run_summary@1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub schema_version: u32,

    pub schema_id: String,

    /// When the summary was created
    pub created_at: DateTime<Utc>,

    /// Aggregated status
    pub status: Status,

    /// Aggregated exit code
    pub exit_code: i32,

    pub files_total: usize,
    pub files_succeeded: usize,
    pub files_failed: usize,
    pub files_cancelled: usize,

    /// Inputs that matched no file
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmatched_inputs: Vec<String>,

    /// Files left unprocessed after an early abort
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_files: Vec<PathBuf>,

    /// Per-file results in processing order
    pub files: Vec<FileResult>,

    /// Reports written, with digests
    pub outputs: Vec<WrittenFile>,

    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,

    pub human_summary: String,
}

impl RunSummary {
    /// Fold per-file results into a summary
    pub fn from_results(
        files: Vec<FileResult>,
        outputs: Vec<WrittenFile>,
        unmatched_inputs: Vec<String>,
        duration_ms: u64,
    ) -> Self {
        let mut aggregator = ExitCodeAggregator::new();
        let (mut succeeded, mut failed, mut cancelled) = (0, 0, 0);
        for file in &files {
            aggregator.add(file.status);
            match file.status {
                Status::Success => succeeded += 1,
                Status::Failed => failed += 1,
                Status::Cancelled => cancelled += 1,
            }
        }

        let status = aggregator.status();
        let human_summary = Self::generate_human_summary(status, files.len(), succeeded, failed, cancelled);

        Self {
            schema_version: RUN_SUMMARY_SCHEMA_VERSION,
            schema_id: RUN_SUMMARY_SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            status,
            exit_code: aggregator.exit_code().as_i32(),
            files_total: files.len(),
            files_succeeded: succeeded,
            files_failed: failed,
            files_cancelled: cancelled,
            unmatched_inputs,
            skipped_files: Vec::new(),
            files,
            outputs,
            duration_ms,
            human_summary,
        }
    }

    /// Record files never started because processing stopped at a failure
    pub fn with_skipped_files(mut self, skipped: Vec<PathBuf>) -> Self {
        if !skipped.is_empty() {
            self.human_summary = format!(
                "{}; {} file(s) not processed",
                self.human_summary,
                skipped.len()
            );
        }
        self.skipped_files = skipped;
        self
    }

    fn generate_human_summary(
        status: Status,
        total: usize,
        succeeded: usize,
        failed: usize,
        cancelled: usize,
    ) -> String {
        if total == 0 {
            return "No input files matched".to_string();
        }
        match status {
            Status::Success => format!("Converted {}/{} file(s)", succeeded, total),
            Status::Failed => format!(
                "Conversion failed: {} succeeded, {} failed, {} cancelled",
                succeeded, failed, cancelled
            ),
            Status::Cancelled => format!(
                "Conversion cancelled: {} succeeded, {} cancelled",
                succeeded, cancelled
            ),
        }
    }

    /// Multi-line report: headline, failures with kind and message, then
    /// successful files by name and case count.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.human_summary);

        for input in &self.unmatched_inputs {
            let _ = writeln!(out, "  no match  {}", input);
        }
        for file in self.files.iter().filter(|f| !f.is_success()) {
            let kind = file.failure_kind.map(|k| k.as_str()).unwrap_or_default();
            let _ = writeln!(
                out,
                "  {:<9} {}: {}: {}",
                if file.status == Status::Cancelled { "cancelled" } else { "FAILED" },
                file.source.display(),
                kind,
                file.message.as_deref().unwrap_or_default()
            );
        }
        for path in &self.skipped_files {
            let _ = writeln!(out, "  skipped   {}", path.display());
        }
        for file in self.files.iter().filter(|f| f.is_success()) {
            let _ = writeln!(
                out,
                "  ok        {} ({} cases)",
                file.source.display(),
                file.cases.unwrap_or_default()
            );
        }
        out
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e)))?;
        fs::write(path, json)
    }
}
