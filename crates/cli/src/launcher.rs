//! Opening the receiving app through the desktop's URL handler.

use {
    async_trait::async_trait,
    sharebridge_ingest::Launcher,
    tracing::warn,
};

/// Hands activation URLs to the platform opener (`xdg-open`, `open`,
/// `start`).
pub struct SystemLauncher;

impl SystemLauncher {
    /// The system launcher, or `None` when this machine has no URL opener.
    pub fn detect() -> Option<Self> {
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            match which::which("xdg-open") {
                Ok(path) => tracing::debug!(path = %path.display(), "found xdg-open"),
                Err(e) => {
                    tracing::debug!(error = %e, "xdg-open not found");
                    return None;
                },
            }
        }
        Some(Self)
    }
}

#[async_trait]
impl Launcher for SystemLauncher {
    fn name(&self) -> &str {
        "system"
    }

    async fn open(&self, url: &str) -> bool {
        let target = url.to_owned();
        match tokio::task::spawn_blocking(move || open::that(target)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(url, error = %e, "URL opener failed");
                false
            },
            Err(e) => {
                warn!(url, error = %e, "URL opener task failed");
                false
            },
        }
    }
}
