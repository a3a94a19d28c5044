use sharebridge_common::FromMessage;

use crate::attachment::LoadError;

/// Generic failure text shown for anything that goes wrong before the host
/// app is opened.
const GENERIC_FAILURE: &str = "An error occurred while sharing the files. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("attachment {index} matches no supported content type")]
    ClassificationFailed { index: usize },
    #[error("failed to load attachment {index}: {source}")]
    LoadFailed {
        index: usize,
        #[source]
        source: LoadError,
    },
    #[error("failed to copy attachment {index} into the container: {source}")]
    CopyFailed {
        index: usize,
        #[source]
        source: sharebridge_media::Error,
    },
    #[error("failed to encode shared batch: {0}")]
    EncodeFailed(#[from] serde_json::Error),
    #[error("failed to write shared batch: {source}")]
    StoreFailed {
        #[source]
        source: sharebridge_common::Error,
    },
    #[error("invalid activation URL: {url}")]
    ActivationUrlInvalid { url: String },
    #[error("no launcher is available to open the host app")]
    NoLauncherAvailable,
    #[error("the host app could not be opened")]
    HostAppUnreachable,
    #[error("{message}")]
    Message { message: String },
}

impl IngestError {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    /// Text suitable for the single failure notice shown to the user.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ActivationUrlInvalid { .. } => "Failed to build the URL used to open the app.",
            Self::NoLauncherAvailable | Self::HostAppUnreachable => "Could not open the app.",
            _ => GENERIC_FAILURE,
        }
    }
}

impl FromMessage for IngestError {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Error = IngestError;
pub type Result<T> = std::result::Result<T, IngestError>;

sharebridge_common::impl_context!();
