use std::path::Path;

use {anyhow::Result, clap::Subcommand};

use sharebridge_config::{
    ShareBridgeConfig,
    validate::{self, Severity},
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the effective configuration (file, env overrides, defaults).
    Show,
}

pub fn handle_config(
    action: &ConfigAction,
    explicit_path: Option<&Path>,
    load: impl FnOnce() -> Result<ShareBridgeConfig>,
) -> Result<()> {
    match *action {
        ConfigAction::Check { verbose } => check(explicit_path, verbose),
        ConfigAction::Show => show(&load()?),
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(explicit_path: Option<&Path>, verbose: bool) -> Result<()> {
    let result = validate::validate(explicit_path);

    if let Some(ref path) = result.config_path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults.\n");
    }

    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
            Severity::Info => (CYAN, "info"),
        };

        if d.path.is_empty() {
            eprintln!("  {BOLD}{color}{label}{RESET} {}", d.message);
        } else {
            eprintln!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message);
        }
        shown += 1;
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn show(config: &ShareBridgeConfig) -> Result<()> {
    print!("{}", render(config)?);
    eprintln!(
        "\n# container root: {}\n# defaults suite: {}/{}.json\n# activation scheme: {}",
        config.container_root().display(),
        config.defaults_dir().display(),
        config.share.app_group_id,
        config.share.url_scheme(),
    );
    Ok(())
}

fn render(config: &ShareBridgeConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_config_validates_cleanly() {
        let rendered = render(&ShareBridgeConfig::default()).unwrap();
        assert!(rendered.contains("[share]"));
        assert!(rendered.contains("shared_key = \"ShareKey\""));

        let result = validate::validate_toml_str(&rendered);
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
    }

    #[test]
    fn explicit_file_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sharebridge.toml");
        std::fs::write(&path, "[share]\nshared_key = \"Other\"\n").unwrap();
        let result = validate::validate(Some(&path));
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
        assert!(!result.has_errors());
    }
}
