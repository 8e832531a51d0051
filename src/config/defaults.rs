//! Built-in defaults (layer 1)

use serde_json::Value;
use testrun_codec::{SuiteGrouping, DEFAULT_MAX_DETAIL_LENGTH};

/// Default file name for merge mode output (without extension)
pub const DEFAULT_MERGED_NAME: &str = "merged";

/// Built-in default configuration values
#[derive(Debug, Clone)]
pub struct BuiltinDefaults {
    pub merge_mode: bool,
    pub continue_on_error: bool,
    pub max_detail_length: usize,
    pub strict: bool,
    pub group_by: SuiteGrouping,
    pub merged_name: String,
    /// 0 lets rayon pick
    pub jobs: usize,
    /// 0 disables the global timeout
    pub timeout_seconds: u64,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            merge_mode: false,
            continue_on_error: false,
            max_detail_length: DEFAULT_MAX_DETAIL_LENGTH,
            strict: false,
            group_by: SuiteGrouping::Run,
            merged_name: DEFAULT_MERGED_NAME.to_string(),
            jobs: 0,
            timeout_seconds: 0,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "merge_mode": self.merge_mode,
            "continue_on_error": self.continue_on_error,
            "max_detail_length": self.max_detail_length,
            "strict": self.strict,
            "group_by": self.group_by,
            "merged_name": self.merged_name,
            "jobs": self.jobs,
            "timeout_seconds": self.timeout_seconds,
        })
    }
}
