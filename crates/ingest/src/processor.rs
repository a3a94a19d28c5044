//! Per-type attachment processors.
//!
//! File, image, and video items are copied into the shared container and
//! described by a [`SharedMediaDescriptor`]. Text and URL items are passed
//! through as strings with no file I/O.

use std::{path::PathBuf, sync::Arc};

use {
    async_trait::async_trait,
    tracing::{debug, info, warn},
};

use sharebridge_media::{
    ContainerStore, MediaIntrospector, PreviewRequest, duration_millis, mime, naming,
};

use crate::{
    attachment::{Attachment, LoadError, LoadedItem, ResolvedFile},
    classifier::AttachmentKind,
    error::{IngestError, Result},
    model::{Contribution, SharedMediaDescriptor},
};

/// Resolves one attachment into one contribution.
#[async_trait]
pub trait AttachmentProcessor: Send + Sync {
    fn kind(&self) -> AttachmentKind;

    async fn process(&self, attachment: &dyn Attachment, index: usize) -> Result<Contribution>;
}

/// Everything the file-backed processors share.
pub struct ProcessorContext {
    pub store: ContainerStore,
    pub introspector: Arc<dyn MediaIntrospector>,
    pub preview: PreviewRequest,
}

impl ProcessorContext {
    pub fn new(store: ContainerStore, introspector: Arc<dyn MediaIntrospector>) -> Self {
        Self {
            store,
            introspector,
            preview: PreviewRequest::default(),
        }
    }

    #[must_use]
    pub fn with_preview(mut self, preview: PreviewRequest) -> Self {
        self.preview = preview;
        self
    }
}

/// Processor for an attachment kind.
pub fn processor_for(
    kind: AttachmentKind,
    ctx: &Arc<ProcessorContext>,
) -> Arc<dyn AttachmentProcessor> {
    match kind {
        AttachmentKind::File => Arc::new(FileProcessor::new(Arc::clone(ctx))),
        AttachmentKind::Image => Arc::new(ImageProcessor::new(Arc::clone(ctx))),
        AttachmentKind::Video => Arc::new(VideoProcessor::new(Arc::clone(ctx))),
        AttachmentKind::Url => Arc::new(UrlProcessor),
        AttachmentKind::Text => Arc::new(TextProcessor),
    }
}

// ── Shared steps ────────────────────────────────────────────────────────────

async fn load(attachment: &dyn Attachment, kind: AttachmentKind, index: usize) -> Result<LoadedItem> {
    attachment
        .load(kind.type_identifier())
        .await
        .map_err(|source| IngestError::LoadFailed { index, source })
}

async fn load_file(
    attachment: &dyn Attachment,
    kind: AttachmentKind,
    index: usize,
) -> Result<ResolvedFile> {
    match load(attachment, kind, index).await? {
        LoadedItem::File(file) => Ok(file),
        other => Err(IngestError::LoadFailed {
            index,
            source: LoadError::unexpected(kind.type_identifier(), &other),
        }),
    }
}

/// A file placed in the container.
struct Placed {
    path: PathBuf,
    name: String,
}

async fn place(
    store: &ContainerStore,
    file: &ResolvedFile,
    kind: AttachmentKind,
    index: usize,
) -> Result<Placed> {
    let name = naming::destination_name(&file.name, kind.media_type().default_extension());
    debug!(index, name = %name, "destination name");
    let path = store
        .place(&file.path, &name)
        .await
        .map_err(|source| IngestError::CopyFailed { index, source })?;
    Ok(Placed { path, name })
}

fn describe(placed: &Placed, kind: AttachmentKind) -> SharedMediaDescriptor {
    SharedMediaDescriptor::file_backed(
        placed.path.display().to_string(),
        mime::mime_for_path(&placed.path),
        kind.media_type(),
    )
}

// ── File ────────────────────────────────────────────────────────────────────

pub struct FileProcessor {
    ctx: Arc<ProcessorContext>,
}

impl FileProcessor {
    pub fn new(ctx: Arc<ProcessorContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl AttachmentProcessor for FileProcessor {
    fn kind(&self) -> AttachmentKind {
        AttachmentKind::File
    }

    async fn process(&self, attachment: &dyn Attachment, index: usize) -> Result<Contribution> {
        let file = load_file(attachment, self.kind(), index).await?;
        let placed = place(&self.ctx.store, &file, self.kind(), index).await?;
        info!(index, path = %placed.path.display(), "file copied");
        Ok(Contribution::Media(describe(&placed, self.kind())))
    }
}

// ── Image ───────────────────────────────────────────────────────────────────

pub struct ImageProcessor {
    ctx: Arc<ProcessorContext>,
}

impl ImageProcessor {
    pub fn new(ctx: Arc<ProcessorContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl AttachmentProcessor for ImageProcessor {
    fn kind(&self) -> AttachmentKind {
        AttachmentKind::Image
    }

    async fn process(&self, attachment: &dyn Attachment, index: usize) -> Result<Contribution> {
        let file = load_file(attachment, self.kind(), index).await?;
        let placed = place(&self.ctx.store, &file, self.kind(), index).await?;
        info!(index, path = %placed.path.display(), "image copied");
        Ok(Contribution::Media(describe(&placed, self.kind())))
    }
}

// ── Video ───────────────────────────────────────────────────────────────────

pub struct VideoProcessor {
    ctx: Arc<ProcessorContext>,
}

impl VideoProcessor {
    pub fn new(ctx: Arc<ProcessorContext>) -> Self {
        Self { ctx }
    }

    /// Thumbnail path for a placed video, rendering it unless a previous run
    /// already left one at the same deterministic path. `None` when no
    /// preview could be produced.
    async fn thumbnail(&self, placed: &Placed, duration_secs: Option<f64>) -> Option<PathBuf> {
        let store = &self.ctx.store;
        let thumb_name = naming::thumbnail_file_name(&placed.name);

        match store.exists(&thumb_name).await {
            Ok(true) => {
                debug!(name = %thumb_name, "reusing cached thumbnail");
                return store.path_for(&thumb_name).ok();
            },
            Ok(false) => {},
            Err(e) => {
                warn!(name = %thumb_name, error = %e, "cannot check thumbnail cache");
                return None;
            },
        }

        let mut request = self.ctx.preview;
        request.at_secs = match duration_secs {
            Some(total) if total.is_finite() && total >= 0.0 => request.at_secs.clamp(0.0, total),
            _ => 0.0,
        };

        let rendered = match self
            .ctx
            .introspector
            .render_preview(&placed.path, request)
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(video = %placed.path.display(), error = %e, "thumbnail render failed");
                return None;
            },
        };

        match store.write(&thumb_name, &rendered).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(name = %thumb_name, error = %e, "thumbnail write failed");
                None
            },
        }
    }
}

#[async_trait]
impl AttachmentProcessor for VideoProcessor {
    fn kind(&self) -> AttachmentKind {
        AttachmentKind::Video
    }

    async fn process(&self, attachment: &dyn Attachment, index: usize) -> Result<Contribution> {
        let file = load_file(attachment, self.kind(), index).await?;
        let placed = place(&self.ctx.store, &file, self.kind(), index).await?;

        let duration_secs = match self.ctx.introspector.duration_secs(&placed.path).await {
            Ok(secs) => Some(secs),
            Err(e) => {
                warn!(index, error = %e, "could not read video duration");
                None
            },
        };

        let descriptor = describe(&placed, self.kind());
        // Without a preview the descriptor carries neither field. With one,
        // an unreadable duration is reported as 0.
        let descriptor = match self.thumbnail(&placed, duration_secs).await {
            Some(thumb) => descriptor.with_preview(
                thumb.display().to_string(),
                duration_secs.map_or(0, duration_millis),
            ),
            None => descriptor,
        };

        info!(
            index,
            path = %placed.path.display(),
            duration = ?descriptor.duration,
            has_thumbnail = descriptor.thumbnail.is_some(),
            "video copied"
        );
        Ok(Contribution::Media(descriptor))
    }
}

// ── Text / Url ──────────────────────────────────────────────────────────────

pub struct TextProcessor;

#[async_trait]
impl AttachmentProcessor for TextProcessor {
    fn kind(&self) -> AttachmentKind {
        AttachmentKind::Text
    }

    async fn process(&self, attachment: &dyn Attachment, index: usize) -> Result<Contribution> {
        match load(attachment, self.kind(), index).await? {
            LoadedItem::Text(value) => Ok(Contribution::Inline {
                value,
                media_type: self.kind().media_type(),
            }),
            other => Err(IngestError::LoadFailed {
                index,
                source: LoadError::unexpected(self.kind().type_identifier(), &other),
            }),
        }
    }
}

pub struct UrlProcessor;

#[async_trait]
impl AttachmentProcessor for UrlProcessor {
    fn kind(&self) -> AttachmentKind {
        AttachmentKind::Url
    }

    async fn process(&self, attachment: &dyn Attachment, index: usize) -> Result<Contribution> {
        match load(attachment, self.kind(), index).await? {
            LoadedItem::Url(url) => Ok(Contribution::Inline {
                value: url.as_str().to_string(),
                media_type: self.kind().media_type(),
            }),
            other => Err(IngestError::LoadFailed {
                index,
                source: LoadError::unexpected(self.kind().type_identifier(), &other),
            }),
        }
    }
}
