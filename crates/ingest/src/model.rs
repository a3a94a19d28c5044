use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a shared item as seen by the receiving app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharedMediaType {
    Image,
    Video,
    Text,
    File,
    Url,
}

impl SharedMediaType {
    /// Extension given to generated names when the source has no name.
    #[must_use]
    pub fn default_extension(self) -> &'static str {
        match self {
            Self::Image => "PNG",
            Self::Video => "MP4",
            Self::Text | Self::File => "TXT",
            Self::Url => "URL",
        }
    }
}

/// Normalized record for one shared item.
///
/// Optional fields are omitted from the encoding when unset. `thumbnail` and
/// `duration` only ever appear on videos whose preview was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedMediaDescriptor {
    /// Container file path, or the raw string for text and URL items.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub media_type: SharedMediaType,
}

impl SharedMediaDescriptor {
    /// Descriptor for a file copied into the container.
    #[must_use]
    pub fn file_backed(
        path: impl Into<String>,
        mime_type: impl Into<String>,
        media_type: SharedMediaType,
    ) -> Self {
        Self {
            path: path.into(),
            mime_type: Some(mime_type.into()),
            thumbnail: None,
            duration: None,
            message: None,
            media_type,
        }
    }

    /// Descriptor carrying a raw text or URL string as its path.
    #[must_use]
    pub fn inline(value: impl Into<String>, media_type: SharedMediaType) -> Self {
        Self {
            path: value.into(),
            mime_type: None,
            thumbnail: None,
            duration: None,
            message: None,
            media_type,
        }
    }

    /// Attach a video preview. Duration is in milliseconds and always set
    /// alongside the thumbnail.
    #[must_use]
    pub fn with_preview(mut self, thumbnail: String, duration: u64) -> Self {
        self.thumbnail = Some(thumbnail);
        self.duration = Some(duration);
        self
    }
}

/// Coarse category attached to the activation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectTag {
    Media,
    Text,
    File,
}

impl RedirectTag {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Media => "media",
            Self::Text => "text",
            Self::File => "file",
        }
    }
}

impl fmt::Display for RedirectTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a single processor adds to the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contribution {
    Media(SharedMediaDescriptor),
    /// Raw text or an absolute URL string.
    Inline {
        value: String,
        media_type: SharedMediaType,
    },
}

/// A finished batch, frozen at finalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Batch {
    Media(Vec<SharedMediaDescriptor>),
    Text(Vec<String>),
}

impl Batch {
    /// Shape contributions into a batch.
    ///
    /// A run made only of text and URLs becomes a string batch. Anything
    /// else becomes a descriptor batch, with text and URLs folded in as
    /// descriptors whose path is the raw string.
    #[must_use]
    pub fn from_contributions(contributions: Vec<Contribution>) -> Self {
        let all_inline = !contributions.is_empty()
            && contributions
                .iter()
                .all(|c| matches!(c, Contribution::Inline { .. }));

        if all_inline {
            return Self::Text(
                contributions
                    .into_iter()
                    .filter_map(|c| match c {
                        Contribution::Inline { value, .. } => Some(value),
                        Contribution::Media(_) => None,
                    })
                    .collect(),
            );
        }

        Self::Media(
            contributions
                .into_iter()
                .map(|c| match c {
                    Contribution::Media(descriptor) => descriptor,
                    Contribution::Inline { value, media_type } => {
                        SharedMediaDescriptor::inline(value, media_type)
                    },
                })
                .collect(),
        )
    }

    /// Tag telling the receiver which shape to expect.
    #[must_use]
    pub fn redirect_tag(&self) -> RedirectTag {
        match self {
            Self::Text(_) => RedirectTag::Text,
            Self::Media(items) if items.iter().all(|d| d.media_type == SharedMediaType::File) => {
                RedirectTag::File
            },
            Self::Media(_) => RedirectTag::Media,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Media(items) => items.len(),
            Self::Text(items) => items.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encode as the compact JSON array stored in the handoff store.
    pub fn encode(&self) -> serde_json::Result<String> {
        match self {
            Self::Media(items) => serde_json::to_string(items),
            Self::Text(items) => serde_json::to_string(items),
        }
    }

    /// Decode a stored value, trying the descriptor shape first.
    pub fn decode(raw: &str) -> serde_json::Result<Self> {
        match serde_json::from_str::<Vec<SharedMediaDescriptor>>(raw) {
            Ok(items) => Ok(Self::Media(items)),
            Err(media_err) => serde_json::from_str::<Vec<String>>(raw)
                .map(Self::Text)
                .map_err(|_| media_err),
        }
    }
}
