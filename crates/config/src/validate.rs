//! Configuration validation.
//!
//! Validates TOML configuration against the known schema, flags unknown or
//! misspelled fields, and checks that the share identity can actually be
//! turned into an activation URL.

use std::{collections::HashMap, path::Path};

use crate::schema::ShareBridgeConfig;

/// Longest thumbnail edge the receiving app accepts.
const MAX_THUMBNAIL_DIMENSION: u32 = 360;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "identity",
    /// "media", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "share.shared_key"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    Struct(HashMap::from([
        (
            "share",
            Struct(HashMap::from([
                ("app_group_id", Leaf),
                ("host_bundle_id", Leaf),
                ("shared_key", Leaf),
                ("url_scheme_prefix", Leaf),
            ])),
        ),
        (
            "storage",
            Struct(HashMap::from([
                ("container_root", Leaf),
                ("defaults_dir", Leaf),
            ])),
        ),
        (
            "media",
            Struct(HashMap::from([
                ("thumbnail_max_dimension", Leaf),
                ("thumbnail_frame_secs", Leaf),
                ("ffmpeg_path", Leaf),
                ("ffprobe_path", Leaf),
            ])),
        ),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&c| (c, levenshtein(needle, c)))
        .filter(|&(_, d)| d > 0 && d <= max_distance)
        .min_by_key(|&(_, d)| d)
        .map(|(c, _)| c)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or the discovered default file
/// when `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(ref actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    match std::fs::read_to_string(actual_path) {
        Ok(content) => {
            let content = crate::env_subst::substitute_env(&content);
            let mut result = validate_toml_str(&content);
            result.config_path = Some(actual_path.clone());
            result
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("failed to read config file: {e}"),
            }],
            config_path: Some(actual_path.clone()),
        },
    }
}

/// Validate a TOML string without touching the filesystem.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let toml_value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("TOML syntax error: {e}"),
            });
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    check_unknown_fields(&toml_value, &build_schema_map(), "", &mut diagnostics);

    match toml::from_str::<ShareBridgeConfig>(toml_str) {
        Ok(config) => check_semantics(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (toml::Value::Table(table), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };

    let known_keys: Vec<&str> = fields.keys().copied().collect();
    for (key, child_value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let Some(child_schema) = fields.get(key.as_str()) {
            check_unknown_fields(child_value, child_schema, &path, diagnostics);
            continue;
        }
        let message = match suggest(key, &known_keys, 3) {
            Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
            None => "unknown field".to_string(),
        };
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "unknown-field",
            path,
            message,
        });
    }
}

/// A URL scheme starts with a letter and continues with letters, digits,
/// `+`, `-` or `.`.
fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn check_semantics(config: &ShareBridgeConfig, diagnostics: &mut Vec<Diagnostic>) {
    let required = [
        ("share.app_group_id", &config.share.app_group_id),
        ("share.host_bundle_id", &config.share.host_bundle_id),
        ("share.shared_key", &config.share.shared_key),
    ];
    for (path, value) in required {
        if value.trim().is_empty() {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "identity",
                path: path.into(),
                message: "must not be empty".into(),
            });
        }
    }

    let scheme = config.share.url_scheme();
    if !config.share.host_bundle_id.trim().is_empty() && !is_valid_scheme(&scheme) {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "identity",
            path: "share.url_scheme_prefix".into(),
            message: format!("\"{scheme}\" is not a valid URL scheme"),
        });
    }

    let dim = config.media.thumbnail_max_dimension;
    if dim == 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "media",
            path: "media.thumbnail_max_dimension".into(),
            message: "thumbnail dimension must be greater than zero".into(),
        });
    } else if dim > MAX_THUMBNAIL_DIMENSION {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "media",
            path: "media.thumbnail_max_dimension".into(),
            message: format!("thumbnails are at most {MAX_THUMBNAIL_DIMENSION}px, got {dim}px"),
        });
    }

    if !config.media.thumbnail_frame_secs.is_finite() || config.media.thumbnail_frame_secs < 0.0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "media",
            path: "media.thumbnail_frame_secs".into(),
            message: "frame offset must be a non-negative number of seconds".into(),
        });
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
