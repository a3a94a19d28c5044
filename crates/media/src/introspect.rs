//! Video introspection: duration and preview frames.
//!
//! The pipeline only needs two answers about a local video file, how long
//! it runs and what it looks like. [`MediaIntrospector`] is the seam; the
//! bundled [`FfmpegIntrospector`] shells out to `ffprobe` and `ffmpeg`.
//!
//! Installation:
//! - macOS: `brew install ffmpeg`
//! - Debian/Ubuntu: `apt install ffmpeg`

use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use {
    async_trait::async_trait,
    serde::Deserialize,
    tokio::process::Command,
    tracing::debug,
};

use crate::{
    error::{Context, Error, Result},
    image_ops::{self, MAX_THUMBNAIL_DIMENSION},
};

const FFPROBE: &str = "ffprobe";
const FFMPEG: &str = "ffmpeg";

/// What preview to render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewRequest {
    /// Longest edge of the rendered preview, in pixels.
    pub max_dimension: u32,
    /// Timestamp of the frame to grab, in seconds.
    pub at_secs: f64,
}

impl PreviewRequest {
    /// Request bounded to [`MAX_THUMBNAIL_DIMENSION`].
    #[must_use]
    pub fn new(max_dimension: u32, at_secs: f64) -> Self {
        Self {
            max_dimension: max_dimension.min(MAX_THUMBNAIL_DIMENSION),
            at_secs,
        }
    }
}

impl Default for PreviewRequest {
    fn default() -> Self {
        Self::new(MAX_THUMBNAIL_DIMENSION, 0.0)
    }
}

/// Opaque media-introspection capability for local video files.
#[async_trait]
pub trait MediaIntrospector: Send + Sync {
    /// Playback duration in seconds.
    async fn duration_secs(&self, video: &Path) -> Result<f64>;

    /// Render a preview frame bounded by `request.max_dimension`, returned
    /// as PNG bytes.
    async fn render_preview(&self, video: &Path, request: PreviewRequest) -> Result<Vec<u8>>;
}

/// Convert seconds to whole milliseconds, rounding to nearest. Negative or
/// non-finite inputs map to zero.
#[must_use]
pub fn duration_millis(secs: f64) -> u64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * 1000.0).round() as u64
}

/// Introspector backed by the ffmpeg command-line tools.
#[derive(Clone, Debug, Default)]
pub struct FfmpegIntrospector {
    ffprobe_path: Option<String>,
    ffmpeg_path: Option<String>,
}

impl FfmpegIntrospector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use explicit binaries instead of searching `PATH`.
    #[must_use]
    pub fn with_paths(ffprobe_path: Option<String>, ffmpeg_path: Option<String>) -> Self {
        Self {
            ffprobe_path,
            ffmpeg_path,
        }
    }

    /// Whether both tools can be found.
    #[must_use]
    pub fn is_available(&self) -> bool {
        find_binary(FFPROBE, self.ffprobe_path.as_deref()).is_some()
            && find_binary(FFMPEG, self.ffmpeg_path.as_deref()).is_some()
    }

    fn binary(&self, name: &'static str, configured: Option<&str>) -> Result<PathBuf> {
        find_binary(name, configured)
            .with_context(|| format!("{name} binary not found in PATH"))
    }
}

/// Find a binary at its configured path, falling back to `PATH`.
fn find_binary(name: &str, configured: Option<&str>) -> Option<PathBuf> {
    if let Some(path_str) = configured {
        let path = sharebridge_common::paths::expand_tilde(path_str);
        if path.is_file() {
            return Some(path);
        }
    }
    which::which(name).ok()
}

#[async_trait]
impl MediaIntrospector for FfmpegIntrospector {
    async fn duration_secs(&self, video: &Path) -> Result<f64> {
        let binary = self.binary(FFPROBE, self.ffprobe_path.as_deref())?;

        let output = Command::new(&binary)
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "json"])
            .arg(video)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("failed to execute ffprobe")?;

        if !output.status.success() {
            return Err(Error::Tool {
                tool: FFPROBE,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let secs = parse_probe_duration(&output.stdout)?;
        debug!(video = %video.display(), secs, "probed duration");
        Ok(secs)
    }

    async fn render_preview(&self, video: &Path, request: PreviewRequest) -> Result<Vec<u8>> {
        let binary = self.binary(FFMPEG, self.ffmpeg_path.as_deref())?;
        let at = if request.at_secs.is_finite() {
            request.at_secs.max(0.0)
        } else {
            0.0
        };

        // Grab one frame as PNG on stdout; sizing happens in image_ops so the
        // bound is enforced the same way for every backend.
        let output = Command::new(&binary)
            .args(["-v", "error", "-ss", &format!("{at:.3}"), "-i"])
            .arg(video)
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("failed to execute ffmpeg")?;

        if !output.status.success() || output.stdout.is_empty() {
            return Err(Error::Tool {
                tool: FFMPEG,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let thumbnail = image_ops::render_thumbnail(&output.stdout, request.max_dimension)?;
        Ok(thumbnail.data)
    }
}

// ── ffprobe output ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: ProbeFormat,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

fn parse_probe_duration(stdout: &[u8]) -> Result<f64> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)?;
    let raw = probe
        .format
        .duration
        .context("ffprobe reported no duration")?;
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|e| Error::external(format!("unparseable duration {raw:?}"), e))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(Error::invalid_input(format!("invalid duration {secs}")));
    }
    Ok(secs)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_rounds_to_nearest() {
        assert_eq!(duration_millis(1.2344), 1234);
        assert_eq!(duration_millis(1.2346), 1235);
        assert_eq!(duration_millis(2.5), 2500);
        assert_eq!(duration_millis(0.0), 0);
        assert_eq!(duration_millis(-3.0), 0);
        assert_eq!(duration_millis(f64::NAN), 0);
        assert_eq!(duration_millis(f64::INFINITY), 0);
    }

    #[test]
    fn preview_request_is_capped() {
        assert_eq!(PreviewRequest::new(1000, 1.5).max_dimension, 360);
        assert_eq!(PreviewRequest::new(120, 0.0).max_dimension, 120);
        assert_eq!(PreviewRequest::default().max_dimension, 360);
    }

    #[test]
    fn parses_ffprobe_json() {
        let out = br#"{"format": {"duration": "12.480000"}}"#;
        assert!((parse_probe_duration(out).unwrap() - 12.48).abs() < 1e-9);
    }

    #[test]
    fn missing_duration_is_error() {
        assert!(parse_probe_duration(br#"{"format": {}}"#).is_err());
        assert!(parse_probe_duration(br#"{}"#).is_err());
        assert!(parse_probe_duration(br#"{"format": {"duration": "N/A"}}"#).is_err());
    }

    #[test]
    fn explicit_missing_binary_falls_back_to_path_lookup() {
        let found = find_binary("sharebridge-no-such-tool", Some("/nope/tool"));
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn unavailable_tool_reports_error() {
        let introspector = FfmpegIntrospector::with_paths(None, None);
        if introspector.is_available() {
            return;
        }
        assert!(
            introspector
                .duration_secs(Path::new("/tmp/none.mp4"))
                .await
                .is_err()
        );
    }
}
