//! MIME lookup against the extension registry shipped with `mime_guess`.

use std::path::Path;

/// MIME type used when the registry has no entry for an extension.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// MIME type for a file extension (case-insensitive, no leading dot).
#[must_use]
pub fn mime_for_extension(ext: &str) -> &'static str {
    mime_guess::from_ext(ext).first_raw().unwrap_or(FALLBACK_MIME)
}

/// MIME type for a path, derived from its extension.
#[must_use]
pub fn mime_for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(FALLBACK_MIME, mime_for_extension)
}

/// Whether the path's extension maps to an `image/*` type.
#[must_use]
pub fn is_image_path(path: &Path) -> bool {
    mime_for_path(path).starts_with("image/")
}

/// Whether the path's extension maps to a `video/*` type.
#[must_use]
pub fn is_video_path(path: &Path) -> bool {
    mime_for_path(path).starts_with("video/")
}
