//! Report output
//!
//! Plans collision-free file names, serializes reports and commits each
//! file atomically (`.<name>.tmp` then rename) so readers never observe a
//! partial report.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use testrun_codec::{to_junit_xml, Counts, Report, SuiteGrouping, TestRun, WriteError};
use tracing::debug;

/// Extension of every produced report
pub const REPORT_EXTENSION: &str = "xml";

/// An output directory that is known to exist
#[derive(Debug, Clone)]
pub struct OutputDir {
    path: PathBuf,
}

impl OutputDir {
    /// Create the directory (and parents) if absent.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, WriteError> {
        let path = path.into();
        if path.exists() && !path.is_dir() {
            return Err(WriteError::io_failure(format!(
                "output path {} exists and is not a directory",
                path.display()
            )));
        }
        fs::create_dir_all(&path).map_err(|e| {
            WriteError::io_failure(format!("cannot create {}: {}", path.display(), e))
        })?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `content` to `file_name` inside the directory atomically.
    pub fn write_atomic(&self, file_name: &str, content: &[u8]) -> Result<PathBuf, WriteError> {
        let final_path = self.path.join(file_name);
        let temp_path = self.path.join(format!(".{}.tmp", file_name));

        if let Err(e) = fs::write(&temp_path, content) {
            let _ = fs::remove_file(&temp_path);
            return Err(WriteError::io_failure(format!(
                "cannot write {}: {}",
                temp_path.display(),
                e
            )));
        }
        fs::rename(&temp_path, &final_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            WriteError::io_failure(format!("cannot commit {}: {}", final_path.display(), e))
        })?;

        Ok(final_path)
    }
}

/// Deterministic, collision-free output names
///
/// Names derive from the source file stem. A stem already taken in this
/// invocation gets `-1`, `-2`, ... appended. Comparison ignores ASCII case
/// so outputs never clash on case-insensitive filesystems.
#[derive(Debug, Default)]
pub struct OutputNamer {
    taken: HashSet<String>,
}

impl OutputNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a report name for a source file
    pub fn name_for(&mut self, source: &Path) -> String {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "report".to_string());
        self.reserve(&stem)
    }

    /// Reserve `<stem>.xml`, or the first free suffixed variant
    pub fn reserve(&mut self, stem: &str) -> String {
        let mut candidate = format!("{}.{}", stem, REPORT_EXTENSION);
        let mut suffix = 0u32;
        while !self.taken.insert(candidate.to_ascii_lowercase()) {
            suffix += 1;
            candidate = format!("{}-{}.{}", stem, suffix, REPORT_EXTENSION);
        }
        candidate
    }

    /// Plan names for sources in the given order
    pub fn plan(sources: &[PathBuf]) -> Vec<String> {
        let mut namer = Self::new();
        sources.iter().map(|s| namer.name_for(s)).collect()
    }
}

/// How runs map onto report files
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteMode {
    /// One file per run; names parallel to the runs
    PerRun { file_names: Vec<String> },
    /// A single report named `name`, written to `<name>.xml`
    Merged { name: String },
}

/// A committed report file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: u64,
    pub counts: Counts,
}

/// Files produced by one `write` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteResult {
    pub files: Vec<WrittenFile>,
}

/// Serialize, validate and commit one report.
pub fn write_report(report: &Report, out_dir: &OutputDir, file_name: &str) -> Result<WrittenFile, WriteError> {
    let bytes = to_junit_xml(report)?;
    let path = out_dir.write_atomic(file_name, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "report written");
    Ok(WrittenFile {
        path,
        sha256: compute_sha256(&bytes),
        bytes: bytes.len() as u64,
        counts: report.counts(),
    })
}

/// Write runs according to `mode`.
pub fn write(
    runs: Vec<TestRun>,
    out_dir: &OutputDir,
    mode: &WriteMode,
    grouping: SuiteGrouping,
) -> Result<WriteResult, WriteError> {
    let mut files = Vec::new();
    match mode {
        WriteMode::PerRun { file_names } => {
            if file_names.len() != runs.len() {
                return Err(WriteError::io_failure(format!(
                    "{} runs but {} planned file names",
                    runs.len(),
                    file_names.len()
                )));
            }
            for (run, file_name) in runs.into_iter().zip(file_names) {
                let report = Report::from_run(run, grouping);
                files.push(write_report(&report, out_dir, file_name)?);
            }
        }
        WriteMode::Merged { name } => {
            let report = Report::merged(name.clone(), runs, grouping);
            let file_name = format!("{}.{}", name, REPORT_EXTENSION);
            files.push(write_report(&report, out_dir, &file_name)?);
        }
    }
    Ok(WriteResult { files })
}

/// Compute SHA-256 of bytes and return hex string
pub fn compute_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
