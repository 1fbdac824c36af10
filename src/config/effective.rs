//! Effective configuration with provenance
//!
//! The merged configuration plus a record of every layer that contributed
//! to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;

/// Environment variable naming the scheduler host.
pub const ENV_HOST: &str = "SINGULARITY_HOST";
/// Environment variable naming the scheduler port.
pub const ENV_PORT: &str = "SINGULARITY_PORT";
/// Environment variable naming the attempt count.
pub const ENV_RETRY: &str = "SINGULARITY_RETRY";

/// Keys that must hold non-negative integers when present.
const INTEGER_KEYS: [&str; 7] = [
    "/port",
    "/retry",
    "/retry_delay_ms",
    "/connect_timeout_seconds",
    "/settle_seconds",
    "/poll/interval_seconds",
    "/poll/max_attempts",
];

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Env,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (file layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (file layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Effective configuration with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// The merged configuration object
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

/// Collect the environment layer through `lookup`.
///
/// Returns `None` when no variable is set.
pub fn env_overrides<F>(lookup: F) -> Result<Option<Value>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut map = Map::new();

    if let Some(host) = lookup(ENV_HOST) {
        map.insert("host".to_string(), Value::String(host));
    }
    for (var, key) in [(ENV_PORT, "port"), (ENV_RETRY, "retry")] {
        if let Some(raw) = lookup(var) {
            let n: u64 = raw.trim().parse().map_err(|_| {
                ConfigError::ParseError(format!("{} must be a non-negative integer, got '{}'", var, raw))
            })?;
            map.insert(key.to_string(), json!(n));
        }
    }

    Ok(if map.is_empty() { None } else { Some(Value::Object(map)) })
}

impl EffectiveConfig {
    /// Build effective config from layers
    pub fn build(
        config_path: Option<&Path>,
        env_overrides: Option<Value>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        if let Some(path) = config_path {
            if path.exists() {
                let (value, digest) = Self::load_toml_file(path)?;
                layers.push(value);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::File,
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                });
            }
        }

        if let Some(env) = env_overrides {
            layers.push(env);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Env,
                path: None,
                digest: None,
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
        Self::validate_config(&merged)?;

        Ok(Self {
            created_at: Utc::now(),
            config: merged,
            sources,
        })
    }

    /// Load and parse a TOML file, returning the value and digest
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;
        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        Ok((toml_to_json(toml_value), digest))
    }

    /// Validate configuration values
    fn validate_config(config: &Value) -> Result<(), ConfigError> {
        match config.get("host").and_then(|v| v.as_str()) {
            Some(host) if !host.trim().is_empty() => {}
            _ => {
                return Err(ConfigError::ValidationError(
                    "host is required (config file, SINGULARITY_HOST or --host)".to_string(),
                ))
            }
        }

        for pointer in INTEGER_KEYS {
            if let Some(value) = config.pointer(pointer) {
                if value.as_u64().is_none() {
                    return Err(ConfigError::ValidationError(format!(
                        "{} must be a non-negative integer, got {}",
                        pointer.trim_start_matches('/').replace('/', "."),
                        value
                    )));
                }
            }
        }

        let port = config.get("port").and_then(|v| v.as_u64()).unwrap_or(0);
        if port > 65535 {
            return Err(ConfigError::ValidationError(
                "port must be in [0, 65535]".to_string(),
            ));
        }

        let retry = config.get("retry").and_then(|v| v.as_u64()).unwrap_or(3);
        if !(1..=10).contains(&retry) {
            return Err(ConfigError::ValidationError(
                "retry must be in [1, 10]".to_string(),
            ));
        }

        if let Some(attempts) = config.pointer("/poll/max_attempts").and_then(|v| v.as_u64()) {
            if attempts == 0 {
                return Err(ConfigError::ValidationError(
                    "poll.max_attempts must be at least 1".to_string(),
                ));
            }
        }

        if let Some(connect) = config.get("connect_timeout_seconds").and_then(|v| v.as_u64()) {
            if connect == 0 || connect > 300 {
                return Err(ConfigError::ValidationError(
                    "connect_timeout_seconds must be in (0, 300]".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Get a config value by path (dot-separated)
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Get a config value as u64
    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(|v| v.as_u64())
    }

    /// Get a config value as string
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }
}

/// Convert TOML Value to JSON Value
pub(crate) fn toml_to_json(toml: toml::Value) -> Value {
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

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
