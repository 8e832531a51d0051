//! Conversion driver
//!
//! Discovers inputs, runs Reader -> Normalizer -> Writer for each file (or
//! for the merged set) and folds the per-file results into a [`RunSummary`].
//!
//! With `continue_on_error` files are converted in parallel on a rayon pool
//! and results are collected in input order. Without it files run one at a
//! time and processing stops at the first failure.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use testrun_codec::{normalize, trx, Report, TestRun, WriteError};

use crate::config::{ConfigError, ConvertOptions};
use crate::discover::discover;
use crate::output::{write, write_report, OutputDir, OutputNamer, WriteMode, WrittenFile};
use crate::signal::CancelState;
use crate::summary::{ExitCode, FileResult, RunSummary};

/// Errors that abort a run before any file is processed
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("output directory: {0}")]
    OutputDir(#[from] WriteError),

    #[error("cannot start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl PipelineError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            PipelineError::Config(_) => ExitCode::Usage,
            PipelineError::OutputDir(_) | PipelineError::ThreadPool(_) => ExitCode::Failed,
        }
    }
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: RunSummary,
}

impl RunOutcome {
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from_i32(self.summary.exit_code).unwrap_or(ExitCode::Failed)
    }
}

/// Convert `inputs` into reports under `out_dir`.
pub fn run<S: AsRef<str>>(
    inputs: &[S],
    out_dir: &Path,
    options: &ConvertOptions,
) -> Result<RunOutcome, PipelineError> {
    let cancel = Arc::new(CancelState::new(options.timeout()));
    run_with_cancel(inputs, out_dir, options, cancel)
}

/// Like [`run`], observing an externally owned cancellation state.
pub fn run_with_cancel<S: AsRef<str>>(
    inputs: &[S],
    out_dir: &Path,
    options: &ConvertOptions,
    cancel: Arc<CancelState>,
) -> Result<RunOutcome, PipelineError> {
    let started = Instant::now();
    options.validate()?;

    let discovery = discover(inputs)?;
    for input in &discovery.unmatched {
        warn!(input = %input, "input matched no files");
    }

    if discovery.is_empty() {
        if options.strict {
            return Err(ConfigError::NoMatchingFiles {
                patterns: inputs.iter().map(|s| s.as_ref().to_string()).collect(),
            }
            .into());
        }
        warn!("no input files matched, nothing to convert");
        let summary = RunSummary::from_results(Vec::new(), Vec::new(), discovery.unmatched, 0);
        return Ok(RunOutcome { summary });
    }

    info!(files = discovery.files.len(), merge = options.merge_mode, "starting conversion");
    let out = OutputDir::create(out_dir)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs)
        .build()?;

    let ctx = Context {
        out: &out,
        options,
        cancel: &cancel,
    };
    let batch = if options.merge_mode {
        convert_merged(&ctx, &pool, &discovery.files)
    } else {
        convert_each(&ctx, &pool, &discovery.files)
    };

    let duration_ms = started.elapsed().as_millis() as u64;
    let summary = RunSummary::from_results(batch.results, batch.outputs, discovery.unmatched, duration_ms)
        .with_skipped_files(batch.skipped);
    info!(
        status = ?summary.status,
        succeeded = summary.files_succeeded,
        failed = summary.files_failed,
        cancelled = summary.files_cancelled,
        duration_ms,
        "conversion finished"
    );
    Ok(RunOutcome { summary })
}

struct Context<'a> {
    out: &'a OutputDir,
    options: &'a ConvertOptions,
    cancel: &'a CancelState,
}

#[derive(Default)]
struct Batch {
    results: Vec<FileResult>,
    outputs: Vec<WrittenFile>,
    skipped: Vec<PathBuf>,
}

impl Batch {
    fn push(&mut self, (result, written): (FileResult, Option<WrittenFile>)) {
        self.results.push(result);
        self.outputs.extend(written);
    }
}

fn convert_each(ctx: &Context<'_>, pool: &rayon::ThreadPool, files: &[PathBuf]) -> Batch {
    let names = OutputNamer::plan(files);
    let mut batch = Batch::default();

    if ctx.options.continue_on_error {
        let converted: Vec<_> = pool.install(|| {
            files
                .par_iter()
                .zip(names.par_iter())
                .map(|(source, name)| convert_file(ctx, source, name))
                .collect()
        });
        for item in converted {
            batch.push(item);
        }
        return batch;
    }

    for (index, (source, name)) in files.iter().zip(&names).enumerate() {
        let item = convert_file(ctx, source, name);
        let failed = !item.0.is_success();
        batch.push(item);
        if failed {
            batch.skipped = files[index + 1..].to_vec();
            if !batch.skipped.is_empty() {
                warn!(remaining = batch.skipped.len(), "stopping at first failure");
            }
            break;
        }
    }
    batch
}

fn convert_file(ctx: &Context<'_>, source: &Path, file_name: &str) -> (FileResult, Option<WrittenFile>) {
    let run = match read_run(ctx, source) {
        Ok(run) => run,
        Err(result) => return (result, None),
    };
    let cases = run.cases.len();
    let run_duration_ms = run.duration_ms;
    let report = Report::from_run(run, ctx.options.group_by);

    match write_report(&report, ctx.out, file_name) {
        Ok(written) => {
            info!(source = %source.display(), output = %written.path.display(), cases, "converted");
            let result = FileResult::success(source, &written.path, cases).with_run_duration(run_duration_ms);
            (result, Some(written))
        }
        Err(e) => {
            warn!(source = %source.display(), error = %e, "write failed");
            (FileResult::from_write_error(source, &e), None)
        }
    }
}

/// Read, parse and normalize one input. A cancelled or failed file yields
/// its `FileResult` as the error.
fn read_run(ctx: &Context<'_>, source: &Path) -> Result<TestRun, FileResult> {
    if let Some(reason) = ctx.cancel.reason() {
        debug!(source = %source.display(), ?reason, "not started");
        return Err(FileResult::cancelled(source, reason.message()));
    }

    let bytes = fs::read(source).map_err(|e| {
        warn!(source = %source.display(), error = %e, "read failed");
        FileResult::unreadable(source, &e)
    })?;

    let fallback_name = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| trx::DEFAULT_RUN_NAME.to_string());
    let run = trx::parse_with_name(&bytes, &fallback_name).map_err(|e| {
        warn!(source = %source.display(), error = %e, "parse failed");
        FileResult::from_parse_error(source, &e)
    })?;

    debug!(source = %source.display(), cases = run.cases.len(), "parsed");
    Ok(normalize(run, &ctx.options.normalize_options()))
}

fn convert_merged(ctx: &Context<'_>, pool: &rayon::ThreadPool, files: &[PathBuf]) -> Batch {
    let mut batch = Batch::default();

    let parsed: Vec<Result<TestRun, FileResult>> = if ctx.options.continue_on_error {
        pool.install(|| files.par_iter().map(|source| read_run(ctx, source)).collect())
    } else {
        let mut parsed = Vec::with_capacity(files.len());
        for (index, source) in files.iter().enumerate() {
            match read_run(ctx, source) {
                Ok(run) => parsed.push(Ok(run)),
                Err(failure) => {
                    // Nothing is written when any input fails outside continue mode
                    warn!(source = %source.display(), "aborting merge before writing");
                    let reason = format!("merge aborted: {} did not convert", source.display());
                    for (earlier, run) in files.iter().zip(parsed.drain(..)) {
                        if let Ok(run) = run {
                            batch.results.push(FileResult::aborted(earlier, run.cases.len(), &reason));
                        }
                    }
                    batch.results.push(failure);
                    batch.skipped = files[index + 1..].to_vec();
                    return batch;
                }
            }
        }
        parsed
    };

    let mut runs = Vec::new();
    let mut merged_sources = Vec::new();
    for (source, item) in files.iter().zip(parsed) {
        match item {
            Ok(run) => {
                merged_sources.push((source.clone(), run.cases.len(), run.duration_ms));
                runs.push(run);
            }
            Err(failure) => batch.results.push(failure),
        }
    }

    if runs.is_empty() {
        warn!("no input parsed, merged report not written");
        return batch;
    }

    let mode = WriteMode::Merged {
        name: ctx.options.merged_name.clone(),
    };
    match write(runs, ctx.out, &mode, ctx.options.group_by) {
        Ok(result) => {
            for written in &result.files {
                info!(
                    output = %written.path.display(),
                    inputs = merged_sources.len(),
                    cases = written.counts.total,
                    "merged report written"
                );
            }
            let output = result
                .files
                .first()
                .map(|w| w.path.clone())
                .unwrap_or_else(|| ctx.out.path().to_path_buf());
            for (source, cases, run_duration_ms) in merged_sources {
                batch
                    .results
                    .push(FileResult::success(source, &output, cases).with_run_duration(run_duration_ms));
            }
            batch.outputs = result.files;
        }
        Err(e) => {
            warn!(error = %e, "merged write failed");
            for (source, _, _) in merged_sources {
                batch.results.push(FileResult::from_write_error(&source, &e));
            }
        }
    }

    batch.results.sort_by(|a, b| a.source.cmp(&b.source));
    batch
}
