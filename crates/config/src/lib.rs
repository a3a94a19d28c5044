//! Configuration loading, validation, and env substitution.
//!
//! Config files: `sharebridge.toml`, `sharebridge.yaml`, or `sharebridge.json`
//! Searched in `./` then `~/.config/sharebridge/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution in all
//! string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{MediaConfig, ShareBridgeConfig, ShareConfig, StorageConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
