//! Deterministic file names inside the shared container.

use {sha2::{Digest, Sha256}, uuid::Uuid};

/// Extension used for generated thumbnails.
pub const THUMBNAIL_EXTENSION: &str = "png";

/// Destination name for an item whose source ends in `last_component`.
///
/// The source name is kept as-is. An empty name is replaced by a fresh
/// uppercase UUID plus `default_extension`, so two unnamed items never
/// collide.
#[must_use]
pub fn destination_name(last_component: &str, default_extension: &str) -> String {
    if !last_component.is_empty() {
        return last_component.to_string();
    }
    format!(
        "{}.{default_extension}",
        Uuid::new_v4().to_string().to_uppercase()
    )
}

/// Thumbnail file name for a container file: a hash of `file_name` with no
/// trace of its extension, suffixed with the thumbnail extension.
#[must_use]
pub fn thumbnail_file_name(file_name: &str) -> String {
    let digest = Sha256::digest(file_name.as_bytes());
    let hex: String = digest.iter().take(16).map(|b| format!("{b:02x}")).collect();
    format!("{hex}.{THUMBNAIL_EXTENSION}")
}
