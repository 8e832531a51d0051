//! Layered configuration
//!
//! Options are resolved in three layers, later layers winning:
//! 1. Built-in defaults
//! 2. Config file (`--config PATH`, else `.trx2junit.toml` in the working directory)
//! 3. CLI flags

mod defaults;
mod effective;
mod merge;
mod options;

pub use defaults::BuiltinDefaults;
pub use effective::{resolve_config_path, ConfigOrigin, ConfigSource, EffectiveConfig, DEFAULT_CONFIG_FILE};
pub use merge::{deep_merge, merge_layers};
pub use options::{ConvertOptions, MAX_DETAIL_LENGTH_RANGE, MAX_TIMEOUT_SECONDS};

use std::path::PathBuf;

/// Configuration errors. Always fatal: nothing is processed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no input files matched: {}", .patterns.join(", "))]
    NoMatchingFiles { patterns: Vec<String> },

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("cannot read {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("parse error in {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}
