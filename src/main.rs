//! trx2junit CLI
//!
//! Entry point for the `trx2junit` command-line tool.

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use testrun_codec::SuiteGrouping;
use tracing::warn;
use trx2junit::config::{resolve_config_path, EffectiveConfig};
use trx2junit::logging::{init_logging, DEFAULT_LOG_LEVEL};
use trx2junit::signal::{CancelState, SignalHandler};
use trx2junit::{run_with_cancel, ExitCode};

#[derive(Parser)]
#[command(name = "trx2junit")]
#[command(about = "Convert TRX test logs into JUnit XML reports", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert TRX files into JUnit XML
    Convert {
        /// Input files or glob patterns
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output directory (created if absent)
        #[arg(long, short = 'o')]
        out: PathBuf,

        /// Write a single merged report
        #[arg(long)]
        merge: bool,

        /// Keep converting after a file fails
        #[arg(long)]
        continue_on_error: bool,

        /// Maximum characters kept from failure messages and stack traces
        #[arg(long = "max-detail-len", value_name = "N")]
        max_detail_len: Option<usize>,

        /// Fail with a usage error when no input matches
        #[arg(long)]
        strict: bool,

        /// Suite grouping: run or class
        #[arg(long, value_name = "MODE")]
        group_by: Option<SuiteGrouping>,

        /// File name (without extension) of the merged report
        #[arg(long, value_name = "NAME")]
        merged_name: Option<String>,

        /// Worker threads (0 = one per CPU)
        #[arg(long, short = 'j')]
        jobs: Option<usize>,

        /// Stop starting new files after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Config file (default: .trx2junit.toml in the working directory)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Also write the run summary as JSON
        #[arg(long, value_name = "PATH")]
        summary_json: Option<PathBuf>,

        /// Log filter used when RUST_LOG is unset
        #[arg(long, default_value = DEFAULT_LOG_LEVEL)]
        log_level: String,
    },

    /// Validate configuration and print the effective options
    Verify {
        /// Config file (default: .trx2junit.toml in the working directory)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },
}

/// Only flags the user actually passed become overrides
struct CliOverrides {
    merge: bool,
    continue_on_error: bool,
    strict: bool,
    max_detail_len: Option<usize>,
    group_by: Option<SuiteGrouping>,
    merged_name: Option<String>,
    jobs: Option<usize>,
    timeout: Option<u64>,
}

impl CliOverrides {
    fn to_value(&self) -> Value {
        let mut map = Map::new();
        if self.merge {
            map.insert("merge_mode".into(), Value::Bool(true));
        }
        if self.continue_on_error {
            map.insert("continue_on_error".into(), Value::Bool(true));
        }
        if self.strict {
            map.insert("strict".into(), Value::Bool(true));
        }
        if let Some(n) = self.max_detail_len {
            map.insert("max_detail_length".into(), n.into());
        }
        if let Some(grouping) = self.group_by {
            map.insert("group_by".into(), serde_json::json!(grouping));
        }
        if let Some(name) = &self.merged_name {
            map.insert("merged_name".into(), Value::String(name.clone()));
        }
        if let Some(jobs) = self.jobs {
            map.insert("jobs".into(), jobs.into());
        }
        if let Some(secs) = self.timeout {
            map.insert("timeout_seconds".into(), secs.into());
        }
        Value::Object(map)
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            inputs,
            out,
            merge,
            continue_on_error,
            max_detail_len,
            strict,
            group_by,
            merged_name,
            jobs,
            timeout,
            config,
            summary_json,
            log_level,
        } => {
            init_logging(&log_level);
            let overrides = CliOverrides {
                merge,
                continue_on_error,
                strict,
                max_detail_len,
                group_by,
                merged_name,
                jobs,
                timeout,
            };
            run_convert(&inputs, &out, overrides, config, summary_json);
        }
        Commands::Verify { config } => {
            init_logging(DEFAULT_LOG_LEVEL);
            run_verify(config);
        }
    }
}

fn load_config(config_path: Option<PathBuf>, cli: Option<Value>) -> EffectiveConfig {
    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error: cannot determine working directory: {}", e);
            process::exit(ExitCode::Usage.as_i32());
        }
    };
    let path = resolve_config_path(config_path.as_deref(), &cwd);

    match EffectiveConfig::build(path.as_deref(), cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(ExitCode::Usage.as_i32());
        }
    }
}

fn run_convert(
    inputs: &[String],
    out: &Path,
    overrides: CliOverrides,
    config_path: Option<PathBuf>,
    summary_json: Option<PathBuf>,
) {
    let config = load_config(config_path, Some(overrides.to_value()));
    let options = config.options;

    let cancel = Arc::new(CancelState::new(options.timeout()));
    if let Err(e) = SignalHandler::new(Arc::clone(&cancel)).install() {
        warn!(error = %e, "interrupt handler not installed");
    }

    let outcome = match run_with_cancel(inputs, out, &options, cancel) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code().as_i32());
        }
    };

    eprint!("{}", outcome.summary.render());

    if let Some(path) = summary_json {
        if let Err(e) = outcome.summary.write_to_file(&path) {
            eprintln!("Error writing summary to {}: {}", path.display(), e);
            process::exit(ExitCode::Failed.as_i32());
        }
    }

    process::exit(outcome.exit_code().as_i32());
}

fn run_verify(config_path: Option<PathBuf>) {
    let config = load_config(config_path, None);
    let options = &config.options;

    println!("Configuration valid");
    println!();
    for source in &config.sources {
        match (&source.path, &source.digest) {
            (Some(path), Some(digest)) => println!("  Source: {:?} {} (sha256 {})", source.origin, path, digest),
            _ => println!("  Source: {:?}", source.origin),
        }
    }
    println!("  Merge mode: {}", options.merge_mode);
    println!("  Continue on error: {}", options.continue_on_error);
    println!("  Max detail length: {}", options.max_detail_length);
    println!("  Strict: {}", options.strict);
    println!("  Group by: {:?}", options.group_by);
    println!("  Merged name: {}", options.merged_name);
    println!("  Jobs: {}", options.jobs);
    println!("  Timeout seconds: {}", options.timeout_seconds);
}
