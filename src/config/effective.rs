//! Effective configuration with provenance
//!
//! Captures the merged options plus where each layer came from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use super::options::ConvertOptions;
use super::ConfigError;

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = ".trx2junit.toml";

/// Origin of a configuration layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Cli,
}

/// A contributing config layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Merged and validated configuration
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub created_at: DateTime<Utc>,

    /// Options deserialized from the merged layers
    pub options: ConvertOptions,

    /// Contributing layers in precedence order
    pub sources: Vec<ConfigSource>,
}

/// Pick the config file: the explicit path if given, else the default file
/// in `cwd` when it exists.
pub fn resolve_config_path(explicit: Option<&Path>, cwd: &Path) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let candidate = cwd.join(DEFAULT_CONFIG_FILE);
            candidate.is_file().then_some(candidate)
        }
    }
}

impl EffectiveConfig {
    /// Build the effective config. A given `config_file` must exist.
    pub fn build(config_file: Option<&Path>, cli_overrides: Option<Value>) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        if let Some(path) = config_file {
            let (value, digest) = load_toml_file(path)?;
            debug!(path = %path.display(), %digest, "loaded config file");
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        let options: ConvertOptions = serde_json::from_value(merged)
            .map_err(|e| ConfigError::InvalidOption(e.to_string()))?;
        options.validate()?;

        Ok(Self {
            created_at: Utc::now(),
            options,
            sources,
        })
    }
}

/// Load and parse a TOML file, returning the value and its digest
fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let bytes = fs::read(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let digest = hex::encode(Sha256::digest(&bytes));

    let contents = String::from_utf8(bytes).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: format!("invalid UTF-8: {}", e),
    })?;
    let table: toml::Value = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok((toml_to_json(table), digest))
}

fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}
