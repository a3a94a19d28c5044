use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::ShareBridgeConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "sharebridge.toml",
    "sharebridge.yaml",
    "sharebridge.yml",
    "sharebridge.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<ShareBridgeConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    let mut config = parse_config(&raw, path)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./sharebridge.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/sharebridge/sharebridge.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `ShareBridgeConfig::default()` (plus env overrides) if no
/// config file is found or the file fails to load.
pub fn discover_and_load() -> ShareBridgeConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    let mut config = ShareBridgeConfig::default();
    apply_env_overrides(&mut config);
    config
}

/// Override identity and storage fields from `SHAREBRIDGE_*` variables.
pub fn apply_env_overrides(config: &mut ShareBridgeConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(
    config: &mut ShareBridgeConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("SHAREBRIDGE_APP_GROUP_ID") {
        config.share.app_group_id = v;
    }
    if let Some(v) = get("SHAREBRIDGE_HOST_BUNDLE_ID") {
        config.share.host_bundle_id = v;
    }
    if let Some(v) = get("SHAREBRIDGE_SHARED_KEY") {
        config.share.shared_key = v;
    }
    if let Some(v) = get("SHAREBRIDGE_CONTAINER_ROOT") {
        config.storage.container_root = Some(PathBuf::from(v));
    }
}

/// Find the first config file in standard locations.
pub(crate) fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/sharebridge/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "sharebridge").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<ShareBridgeConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
