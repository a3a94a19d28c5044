//! Attachment handles as handed over by a share action.
//!
//! An attachment can be asked which content types it conforms to without
//! resolving anything; resolution itself is asynchronous and may fail.

use std::path::PathBuf;

use {async_trait::async_trait, url::Url};

use sharebridge_media::mime;

/// Uniform type identifiers an attachment may conform to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeIdentifier {
    FileUrl,
    Image,
    Movie,
    Url,
    Text,
}

impl TypeIdentifier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FileUrl => "public.file-url",
            Self::Image => "public.image",
            Self::Movie => "public.movie",
            Self::Url => "public.url",
            Self::Text => "public.text",
        }
    }
}

impl std::fmt::Display for TypeIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A local file resolved from an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Where the content can be read from.
    pub path: PathBuf,
    /// Last path component as reported by the provider. May be empty.
    pub name: String,
}

impl ResolvedFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }

    pub fn with_name(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }
}

/// Resolved content of an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedItem {
    File(ResolvedFile),
    Text(String),
    Url(Url),
}

impl LoadedItem {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Text(_) => "text",
            Self::Url(_) => "url",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("attachment does not provide {0}")]
    Unsupported(TypeIdentifier),
    #[error("expected {expected} content, got {got}")]
    UnexpectedItem {
        expected: TypeIdentifier,
        got: &'static str,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{message}")]
    Provider { message: String },
}

impl LoadError {
    #[must_use]
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unexpected(expected: TypeIdentifier, got: &LoadedItem) -> Self {
        Self::UnexpectedItem {
            expected,
            got: got.kind_name(),
        }
    }
}

/// One shared item.
#[async_trait]
pub trait Attachment: Send + Sync {
    /// Whether the item can be resolved as `type_id`, without resolving it.
    fn conforms_to(&self, type_id: TypeIdentifier) -> bool;

    /// Resolve the item's content as `type_id`.
    async fn load(&self, type_id: TypeIdentifier) -> Result<LoadedItem, LoadError>;
}

/// Attachments built from local paths and strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalAttachment {
    /// Generic file. Also conforms to image/movie when its extension says so.
    File(PathBuf),
    /// Image that is not exposed as a file URL.
    Image(PathBuf),
    /// Video that is not exposed as a file URL.
    Video(PathBuf),
    Text(String),
    Url(Url),
}

#[async_trait]
impl Attachment for LocalAttachment {
    fn conforms_to(&self, type_id: TypeIdentifier) -> bool {
        match (self, type_id) {
            (Self::File(_), TypeIdentifier::FileUrl)
            | (Self::Image(_), TypeIdentifier::Image)
            | (Self::Video(_), TypeIdentifier::Movie)
            | (Self::Text(_), TypeIdentifier::Text)
            | (Self::Url(_), TypeIdentifier::Url) => true,
            (Self::File(path), TypeIdentifier::Image) => mime::is_image_path(path),
            (Self::File(path), TypeIdentifier::Movie) => mime::is_video_path(path),
            _ => false,
        }
    }

    async fn load(&self, type_id: TypeIdentifier) -> Result<LoadedItem, LoadError> {
        if !self.conforms_to(type_id) {
            return Err(LoadError::Unsupported(type_id));
        }
        match self {
            Self::File(path) | Self::Image(path) | Self::Video(path) => {
                let meta = tokio::fs::metadata(path).await?;
                if !meta.is_file() {
                    return Err(LoadError::provider(format!(
                        "{} is not a regular file",
                        path.display()
                    )));
                }
                Ok(LoadedItem::File(ResolvedFile::from_path(path)))
            },
            Self::Text(text) => Ok(LoadedItem::Text(text.clone())),
            Self::Url(url) => Ok(LoadedItem::Url(url.clone())),
        }
    }
}
