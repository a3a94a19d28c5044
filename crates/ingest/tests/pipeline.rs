#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use {async_trait::async_trait, tempfile::TempDir};

use {
    sharebridge_config::ShareBridgeConfig,
    sharebridge_ingest::{
        Attachment, Batch, HandoffStore, IngestError, Launcher, LoadError, LoadedItem,
        LocalAttachment, RedirectTag, ResolvedFile, RunOutcome, ShareHost, ShareSession,
        SharedMediaType, SuiteDefaults, TypeIdentifier,
    },
    sharebridge_media::{MediaIntrospector, PreviewRequest, naming},
};

// ── Fakes ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingHost {
    errors: Mutex<Vec<String>>,
    completions: AtomicUsize,
}

#[async_trait]
impl ShareHost for RecordingHost {
    async fn present_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_owned());
    }

    async fn complete_request(&self) {
        self.completions.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingLauncher {
    opened: Mutex<Vec<String>>,
}

#[async_trait]
impl Launcher for RecordingLauncher {
    fn name(&self) -> &str {
        "recording"
    }

    async fn open(&self, url: &str) -> bool {
        self.opened.lock().unwrap().push(url.to_owned());
        true
    }
}

struct FakeIntrospector {
    secs: f64,
    renders: AtomicUsize,
    requests: Mutex<Vec<PreviewRequest>>,
}

impl FakeIntrospector {
    fn new(secs: f64) -> Self {
        Self {
            secs,
            renders: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MediaIntrospector for FakeIntrospector {
    async fn duration_secs(&self, _video: &Path) -> sharebridge_media::Result<f64> {
        Ok(self.secs)
    }

    async fn render_preview(
        &self,
        _video: &Path,
        request: PreviewRequest,
    ) -> sharebridge_media::Result<Vec<u8>> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        Ok(b"\x89PNG fake".to_vec())
    }
}

/// A file whose provider reports the given last path component.
struct ProvidedFile {
    path: PathBuf,
    name: String,
}

#[async_trait]
impl Attachment for ProvidedFile {
    fn conforms_to(&self, type_id: TypeIdentifier) -> bool {
        type_id == TypeIdentifier::FileUrl
    }

    async fn load(&self, _type_id: TypeIdentifier) -> Result<LoadedItem, LoadError> {
        Ok(LoadedItem::File(ResolvedFile::with_name(&self.path, &self.name)))
    }
}

struct Unsupported;

#[async_trait]
impl Attachment for Unsupported {
    fn conforms_to(&self, _type_id: TypeIdentifier) -> bool {
        false
    }

    async fn load(&self, type_id: TypeIdentifier) -> Result<LoadedItem, LoadError> {
        Err(LoadError::Unsupported(type_id))
    }
}

// ── Harness ─────────────────────────────────────────────────────────────────

struct Harness {
    dir: TempDir,
    config: ShareBridgeConfig,
    host: Arc<RecordingHost>,
    launcher: Arc<RecordingLauncher>,
    introspector: Arc<FakeIntrospector>,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ShareBridgeConfig::default();
        config.storage.container_root = Some(dir.path().join("container"));
        config.storage.defaults_dir = Some(dir.path().join("prefs"));
        Self {
            dir,
            config,
            host: Arc::new(RecordingHost::default()),
            launcher: Arc::new(RecordingLauncher::default()),
            introspector: Arc::new(FakeIntrospector::new(1.2346)),
        }
    }

    async fn session(&self) -> ShareSession {
        self.session_with(Some(self.launcher.clone() as Arc<dyn Launcher>))
            .await
    }

    async fn session_with(&self, launcher: Option<Arc<dyn Launcher>>) -> ShareSession {
        ShareSession::from_config(
            &self.config,
            self.introspector.clone(),
            launcher,
            self.host.clone(),
        )
        .await
        .unwrap()
    }

    fn source(&self, name: &str, body: &[u8]) -> PathBuf {
        self.source_in("inbox", name, body)
    }

    fn source_in(&self, folder: &str, name: &str, body: &[u8]) -> PathBuf {
        let inbox = self.dir.path().join(folder);
        std::fs::create_dir_all(&inbox).unwrap();
        let path = inbox.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn container(&self) -> PathBuf {
        self.dir.path().join("container")
    }

    fn suite_file(&self) -> PathBuf {
        self.dir
            .path()
            .join("prefs")
            .join(format!("{}.json", self.config.share.app_group_id))
    }

    async fn stored(&self) -> Option<Batch> {
        let suite = SuiteDefaults::open(self.dir.path().join("prefs"), &self.config.share.app_group_id)
            .await
            .unwrap();
        HandoffStore::new(Arc::new(suite), self.config.share.shared_key.clone())
            .read()
            .await
            .unwrap()
    }

    fn errors(&self) -> Vec<String> {
        self.host.errors.lock().unwrap().clone()
    }

    fn completions(&self) -> usize {
        self.host.completions.load(Ordering::SeqCst)
    }

    fn opened(&self) -> Vec<String> {
        self.launcher.opened.lock().unwrap().clone()
    }
}

// ── Scenarios ───────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn three_files_including_unnamed_are_handed_off() {
    let h = Harness::new();
    let a = h.source("a.txt", b"text");
    let b = h.source("b.jpg", b"jpeg bytes");
    let c = h.source("blob", b"no name");

    let attachments: Vec<Arc<dyn Attachment>> = vec![
        Arc::new(LocalAttachment::File(a)),
        Arc::new(LocalAttachment::File(b)),
        Arc::new(ProvidedFile {
            path: c,
            name: String::new(),
        }),
    ];
    let outcome = h.session().await.post(attachments).await;

    let RunOutcome::Delivered { batch, activation } = outcome else {
        panic!("expected delivery, got {outcome:?}");
    };
    let Batch::Media(items) = &batch else {
        panic!("expected descriptor batch");
    };
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|d| d.media_type == SharedMediaType::File));
    assert_eq!(items.iter().filter(|d| d.path.ends_with(".TXT")).count(), 1);
    // A file-backed image still goes through the file route.
    let jpg = items.iter().find(|d| d.path.ends_with("b.jpg")).unwrap();
    assert_eq!(jpg.mime_type.as_deref(), Some("image/jpeg"));
    for item in items {
        assert!(Path::new(&item.path).starts_with(h.container()));
        assert!(Path::new(&item.path).exists());
        assert!(item.thumbnail.is_none());
    }

    assert_eq!(activation.tag, RedirectTag::File);
    assert_eq!(h.opened(), vec![activation.url.clone()]);
    assert!(activation.url.ends_with("dataUrl=ShareKey%23file"));
    assert!(h.errors().is_empty());
    assert_eq!(h.completions(), 1);
    assert_eq!(h.stored().await, Some(batch));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_named_files_replace_existing_copy() {
    let h = Harness::new();
    std::fs::create_dir_all(h.container()).unwrap();
    std::fs::write(h.container().join("IMG_0001.JPG"), b"from last time").unwrap();

    let first = h.source_in("camera", "IMG_0001.JPG", b"camera");
    let second = h.source_in("downloads", "IMG_0001.JPG", b"downloads");
    let outcome = h
        .session()
        .await
        .post(vec![
            Arc::new(LocalAttachment::File(first)),
            Arc::new(LocalAttachment::File(second)),
        ])
        .await;

    let RunOutcome::Delivered { batch, .. } = outcome else {
        panic!("expected delivery, got {outcome:?}");
    };
    assert_eq!(batch.len(), 2);
    let placed = std::fs::read(h.container().join("IMG_0001.JPG")).unwrap();
    assert!(placed == b"camera" || placed == b"downloads");
    assert!(h.errors().is_empty());
    assert_eq!(h.opened().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_failed_load_aborts_the_run() {
    let h = Harness::new();
    let ok = h.source("ok.txt", b"fine");
    let attachments: Vec<Arc<dyn Attachment>> = vec![
        Arc::new(LocalAttachment::File(ok)),
        Arc::new(LocalAttachment::File(h.dir.path().join("missing.txt"))),
        Arc::new(LocalAttachment::Text("hello".into())),
    ];
    let outcome = h.session().await.post(attachments).await;

    assert!(matches!(
        outcome,
        RunOutcome::Failed(IngestError::LoadFailed { index: 1, .. })
    ));
    assert_eq!(h.errors().len(), 1);
    assert_eq!(h.completions(), 1);
    assert!(h.opened().is_empty());
    assert!(!h.suite_file().exists());
}

#[tokio::test]
async fn cached_thumbnail_is_reused() {
    let h = Harness::new();
    let clip = h.source("clip.mp4", b"video");
    let thumb = h.container().join(naming::thumbnail_file_name("clip.mp4"));
    std::fs::create_dir_all(h.container()).unwrap();
    std::fs::write(&thumb, b"cached").unwrap();

    let outcome = h
        .session()
        .await
        .post(vec![Arc::new(LocalAttachment::Video(clip))])
        .await;

    let RunOutcome::Delivered { batch, activation } = outcome else {
        panic!("expected delivery");
    };
    let Batch::Media(items) = batch else {
        panic!("expected descriptor batch");
    };
    assert_eq!(items[0].media_type, SharedMediaType::Video);
    assert_eq!(items[0].thumbnail.as_deref(), Some(thumb.display().to_string().as_str()));
    assert_eq!(items[0].duration, Some(1235));
    assert_eq!(h.introspector.renders.load(Ordering::SeqCst), 0);
    assert_eq!(std::fs::read(&thumb).unwrap(), b"cached");
    assert_eq!(activation.tag, RedirectTag::Media);
}

#[tokio::test]
async fn repeated_share_yields_same_video_metadata() {
    let h = Harness::new();
    let clip = h.source("clip.mov", b"video");

    let mut seen = Vec::new();
    for _ in 0..2 {
        let outcome = h
            .session()
            .await
            .post(vec![Arc::new(LocalAttachment::Video(clip.clone()))])
            .await;
        let RunOutcome::Delivered {
            batch: Batch::Media(items),
            ..
        } = outcome
        else {
            panic!("expected descriptor batch");
        };
        seen.push((items[0].duration, items[0].thumbnail.clone()));
    }

    assert_eq!(seen[0], seen[1]);
    assert_eq!(seen[0].0, Some(1235));
    assert_eq!(h.introspector.renders.load(Ordering::SeqCst), 1);
    assert_eq!(h.completions(), 2);
}

#[tokio::test]
async fn oversized_preview_setting_is_capped() {
    let mut h = Harness::new();
    h.config.media.thumbnail_max_dimension = 1000;
    let clip = h.source("clip.mp4", b"video");

    let outcome = h
        .session()
        .await
        .post(vec![Arc::new(LocalAttachment::Video(clip))])
        .await;

    assert!(matches!(outcome, RunOutcome::Delivered { .. }));
    let requests = h.introspector.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].max_dimension, 360);
}

#[tokio::test]
async fn text_and_urls_become_a_string_batch() {
    let h = Harness::new();
    let attachments: Vec<Arc<dyn Attachment>> = vec![
        Arc::new(LocalAttachment::Text("hello".into())),
        Arc::new(LocalAttachment::Url(
            url::Url::parse("https://example.com/a?b=c").unwrap(),
        )),
    ];
    let outcome = h.session().await.post(attachments).await;

    let RunOutcome::Delivered { batch, activation } = outcome else {
        panic!("expected delivery");
    };
    let Batch::Text(mut values) = batch else {
        panic!("expected string batch");
    };
    values.sort();
    assert_eq!(values, vec!["hello", "https://example.com/a?b=c"]);
    assert_eq!(activation.tag, RedirectTag::Text);
    // Nothing was copied.
    assert!(!h.container().exists());
}

#[tokio::test]
async fn text_mixed_with_media_is_folded_into_descriptors() {
    let h = Harness::new();
    let photo = h.source("photo.png", b"png");
    let attachments: Vec<Arc<dyn Attachment>> = vec![
        Arc::new(LocalAttachment::Image(photo)),
        Arc::new(LocalAttachment::Text("caption".into())),
    ];
    let outcome = h.session().await.post(attachments).await;

    let RunOutcome::Delivered {
        batch: Batch::Media(items),
        activation,
    } = outcome
    else {
        panic!("expected descriptor batch");
    };
    let text = items
        .iter()
        .find(|d| d.media_type == SharedMediaType::Text)
        .unwrap();
    assert_eq!(text.path, "caption");
    assert!(text.mime_type.is_none());
    assert_eq!(activation.tag, RedirectTag::Media);
}

#[tokio::test]
async fn empty_post_completes_without_side_effects() {
    let h = Harness::new();
    let outcome = h.session().await.post(Vec::new()).await;

    assert!(matches!(outcome, RunOutcome::Empty));
    assert_eq!(h.completions(), 1);
    assert!(h.errors().is_empty());
    assert!(h.opened().is_empty());
    assert!(!h.suite_file().exists());
}

#[tokio::test]
async fn cancel_completes_immediately() {
    let h = Harness::new();
    let outcome = h.session().await.cancel().await;
    assert!(matches!(outcome, RunOutcome::Cancelled));
    assert_eq!(h.completions(), 1);
    assert!(h.errors().is_empty());
}

#[tokio::test]
async fn unsupported_attachment_fails_fast() {
    let h = Harness::new();
    let text: Arc<dyn Attachment> = Arc::new(LocalAttachment::Text("x".into()));
    let outcome = h.session().await.post(vec![text, Arc::new(Unsupported)]).await;

    assert!(matches!(
        outcome,
        RunOutcome::Failed(IngestError::ClassificationFailed { index: 1 })
    ));
    assert_eq!(h.errors().len(), 1);
    assert_eq!(h.completions(), 1);
    assert!(!h.suite_file().exists());
}

#[tokio::test]
async fn missing_launcher_reports_after_storing() {
    let h = Harness::new();
    let outcome = h
        .session_with(None)
        .await
        .post(vec![Arc::new(LocalAttachment::Text("hi".into()))])
        .await;

    assert!(matches!(
        outcome,
        RunOutcome::Failed(IngestError::NoLauncherAvailable)
    ));
    assert_eq!(h.errors(), vec!["Could not open the app.".to_string()]);
    assert_eq!(h.completions(), 1);
    assert_eq!(h.stored().await, Some(Batch::Text(vec!["hi".into()])));
}
