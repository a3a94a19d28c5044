/// Config schema types (share identity, storage locations, media tooling).
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareBridgeConfig {
    pub share: ShareConfig,
    pub storage: StorageConfig,
    pub media: MediaConfig,
}

/// Identity of the shared-storage scope and of the receiving app.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Shared-storage identity. Names both the container directory and the
    /// key-value suite.
    pub app_group_id: String,
    /// Registered identity of the receiving app. The activation URL scheme
    /// is `<url_scheme_prefix><host_bundle_id>`.
    pub host_bundle_id: String,
    /// Fixed key the batch is stored under.
    pub shared_key: String,
    pub url_scheme_prefix: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            app_group_id: "group.com.example.receiveSharingFiles".into(),
            host_bundle_id: "com.example.receiveSharingFiles".into(),
            shared_key: "ShareKey".into(),
            url_scheme_prefix: "ShareMedia-".into(),
        }
    }
}

impl ShareConfig {
    /// URL scheme the receiving app is registered under.
    #[must_use]
    pub fn url_scheme(&self) -> String {
        format!("{}{}", self.url_scheme_prefix, self.host_bundle_id)
    }
}

/// Where the shared container and the key-value suite live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Shared file root. Defaults to `<data dir>/<app_group_id>`.
    pub container_root: Option<PathBuf>,
    /// Directory holding key-value suites. Defaults to
    /// `<container_root>/Library/Preferences`.
    pub defaults_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Longest edge of a generated video thumbnail, in pixels.
    pub thumbnail_max_dimension: u32,
    /// Timestamp (seconds) of the frame used for the thumbnail. Clamped to
    /// the video's duration.
    pub thumbnail_frame_secs: f64,
    pub ffmpeg_path: Option<String>,
    pub ffprobe_path: Option<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            thumbnail_max_dimension: 360,
            thumbnail_frame_secs: 0.0,
            ffmpeg_path: None,
            ffprobe_path: None,
        }
    }
}

impl ShareBridgeConfig {
    /// Resolved shared container root.
    #[must_use]
    pub fn container_root(&self) -> PathBuf {
        if let Some(ref root) = self.storage.container_root {
            return sharebridge_common::paths::expand_tilde(&root.to_string_lossy());
        }
        sharebridge_common::paths::default_data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(&self.share.app_group_id)
    }

    /// Resolved directory holding key-value suites.
    #[must_use]
    pub fn defaults_dir(&self) -> PathBuf {
        match self.storage.defaults_dir {
            Some(ref dir) => sharebridge_common::paths::expand_tilde(&dir.to_string_lossy()),
            None => self.container_root().join("Library").join("Preferences"),
        }
    }
}
