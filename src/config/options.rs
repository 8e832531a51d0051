//! Resolved conversion options

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;
use testrun_codec::{NormalizeOptions, SuiteGrouping};

use super::defaults::BuiltinDefaults;
use super::ConfigError;

/// Accepted range for `max_detail_length`, in characters
pub const MAX_DETAIL_LENGTH_RANGE: RangeInclusive<usize> = 64..=1_048_576;

/// Upper bound for `timeout_seconds` (24 hours)
pub const MAX_TIMEOUT_SECONDS: u64 = 86_400;

/// Options driving one `convert` invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConvertOptions {
    /// Write one merged report instead of one per input
    pub merge_mode: bool,
    /// Keep going after a file fails
    pub continue_on_error: bool,
    /// Cap on failure message and stack trace length
    pub max_detail_length: usize,
    /// Treat an empty match set as a usage error
    pub strict: bool,
    pub group_by: SuiteGrouping,
    /// Merged report file name, without extension
    pub merged_name: String,
    /// Worker threads (0 = rayon default)
    pub jobs: usize,
    /// Global deadline in seconds (0 = none)
    pub timeout_seconds: u64,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        let defaults = BuiltinDefaults::default();
        Self {
            merge_mode: defaults.merge_mode,
            continue_on_error: defaults.continue_on_error,
            max_detail_length: defaults.max_detail_length,
            strict: defaults.strict,
            group_by: defaults.group_by,
            merged_name: defaults.merged_name,
            jobs: defaults.jobs,
            timeout_seconds: defaults.timeout_seconds,
        }
    }
}

impl ConvertOptions {
    /// Validate option values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !MAX_DETAIL_LENGTH_RANGE.contains(&self.max_detail_length) {
            return Err(ConfigError::InvalidOption(format!(
                "max_detail_length must be in [{}, {}], got {}",
                MAX_DETAIL_LENGTH_RANGE.start(),
                MAX_DETAIL_LENGTH_RANGE.end(),
                self.max_detail_length
            )));
        }

        let name = self.merged_name.as_str();
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidOption(
                "merged_name must not be empty".to_string(),
            ));
        }
        if name.trim() != name {
            return Err(ConfigError::InvalidOption(format!(
                "merged_name must not start or end with whitespace, got '{}'",
                name
            )));
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(ConfigError::InvalidOption(format!(
                "merged_name must be a plain file name, got '{}'",
                self.merged_name
            )));
        }

        if self.timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(ConfigError::InvalidOption(format!(
                "timeout_seconds must be at most {}, got {}",
                MAX_TIMEOUT_SECONDS, self.timeout_seconds
            )));
        }

        Ok(())
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions::with_max_detail_length(self.max_detail_length)
    }

    /// Global deadline, if one is configured
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }
}
