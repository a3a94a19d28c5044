//! `sharebridge share`: run one share session from the command line.

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::{Context, Result},
    async_trait::async_trait,
    clap::Args,
    sharebridge_config::ShareBridgeConfig,
    sharebridge_ingest::{
        Attachment, Launcher, LocalAttachment, RunOutcome, ShareHost, ShareSession,
    },
    sharebridge_media::FfmpegIntrospector,
    tracing::{debug, warn},
};

use crate::launcher::SystemLauncher;

#[derive(Args, Debug, Default)]
pub struct ShareArgs {
    /// File to share (repeatable). Images and videos are detected by extension.
    #[arg(long = "file", value_name = "PATH")]
    files: Vec<PathBuf>,
    /// Image to share as an image item (repeatable).
    #[arg(long = "image", value_name = "PATH")]
    images: Vec<PathBuf>,
    /// Video to share as a movie item (repeatable).
    #[arg(long = "video", value_name = "PATH")]
    videos: Vec<PathBuf>,
    /// Plain text to share (repeatable).
    #[arg(long = "text", value_name = "TEXT")]
    texts: Vec<String>,
    /// URL to share (repeatable).
    #[arg(long = "url", value_name = "URL")]
    urls: Vec<String>,
}

impl ShareArgs {
    fn attachments(&self) -> Result<Vec<Arc<dyn Attachment>>> {
        let mut out: Vec<Arc<dyn Attachment>> = Vec::new();
        for path in &self.files {
            out.push(Arc::new(LocalAttachment::File(path.clone())));
        }
        for path in &self.images {
            out.push(Arc::new(LocalAttachment::Image(path.clone())));
        }
        for path in &self.videos {
            out.push(Arc::new(LocalAttachment::Video(path.clone())));
        }
        for text in &self.texts {
            out.push(Arc::new(LocalAttachment::Text(text.clone())));
        }
        for raw in &self.urls {
            let url = url::Url::parse(raw).with_context(|| format!("invalid URL: {raw}"))?;
            out.push(Arc::new(LocalAttachment::Url(url)));
        }
        Ok(out)
    }
}

/// Reports to the terminal.
struct ConsoleHost;

#[async_trait]
impl ShareHost for ConsoleHost {
    async fn present_error(&self, message: &str) {
        eprintln!("\x1b[1m\x1b[31merror\x1b[0m {message}");
    }

    async fn complete_request(&self) {
        debug!("share request completed");
    }
}

pub async fn handle_share(args: &ShareArgs, config: &ShareBridgeConfig) -> Result<()> {
    let attachments = args.attachments()?;

    let introspector = FfmpegIntrospector::with_paths(
        config.media.ffprobe_path.clone(),
        config.media.ffmpeg_path.clone(),
    );
    if !args.videos.is_empty() && !introspector.is_available() {
        warn!("ffmpeg/ffprobe not found; videos will be shared without previews");
    }
    let launcher = SystemLauncher::detect().map(|l| Arc::new(l) as Arc<dyn Launcher>);

    let session =
        ShareSession::from_config(config, Arc::new(introspector), launcher, Arc::new(ConsoleHost))
            .await?;

    match session.post(attachments).await {
        RunOutcome::Delivered { batch, activation } => {
            println!(
                "Shared {} item(s) as {}.\nActivation URL: {}",
                batch.len(),
                activation.tag,
                activation.url
            );
            Ok(())
        },
        RunOutcome::Empty | RunOutcome::Cancelled => {
            println!("Nothing to share.");
            Ok(())
        },
        // The host already showed the error notice.
        RunOutcome::Failed(_) => std::process::exit(1),
    }
}
