//! Configuration merge system
//!
//! Implements the 4-layer configuration merge:
//! 1. Built-in defaults
//! 2. Config file (`--config`, default `singularity.toml`)
//! 3. Environment (`SINGULARITY_HOST`, `SINGULARITY_PORT`, `SINGULARITY_RETRY`)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;
mod settings;

pub use defaults::BuiltinDefaults;
pub use effective::{env_overrides, ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use merge::{deep_merge, merge_layers};
pub use settings::{endpoint_url, ClientSettings, ReconcileSettings};
