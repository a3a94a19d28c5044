use std::{
    collections::HashMap,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use tracing::debug;

use crate::error::{Error, Result};

/// The shared container root both processes can see.
///
/// Files are placed by name directly under the root. Placement replaces any
/// existing file of the same name and always copies, since the source is
/// owned by whoever handed it over and may vanish afterwards.
///
/// Content is staged in a temporary file inside the root and renamed over
/// the destination, so readers never see a missing or half-written file.
/// Writers to the same name are serialized.
#[derive(Debug, Clone)]
pub struct ContainerStore {
    root: PathBuf,
    locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl ContainerStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create the root directory if it does not exist yet.
    pub async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Absolute path for `file_name` inside the root.
    pub fn path_for(&self, file_name: &str) -> Result<PathBuf> {
        validate_file_name(file_name)?;
        Ok(self.root.join(file_name))
    }

    pub async fn exists(&self, file_name: &str) -> Result<bool> {
        let path = self.path_for(file_name)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    /// Copy `source` into the root as `file_name`, replacing what was there.
    pub async fn place(&self, source: &Path, file_name: &str) -> Result<PathBuf> {
        let source = source.to_path_buf();
        let dest = self
            .replace_with(file_name, move |tmp| {
                let mut input = std::fs::File::open(&source)?;
                let bytes = std::io::copy(&mut input, tmp)?;
                debug!(source = %source.display(), bytes, "copied into container");
                Ok(())
            })
            .await?;
        Ok(dest)
    }

    /// Write `data` into the root as `file_name`, replacing what was there.
    pub async fn write(&self, file_name: &str, data: &[u8]) -> Result<PathBuf> {
        let data = data.to_vec();
        self.replace_with(file_name, move |tmp| Ok(tmp.write_all(&data)?))
            .await
    }

    fn lock_for(&self, file_name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(file_name.to_owned()).or_default())
    }

    /// Stage content via `fill` in a temp file under the root, then rename
    /// it over `file_name`.
    async fn replace_with<F>(&self, file_name: &str, fill: F) -> Result<PathBuf>
    where
        F: FnOnce(&mut std::fs::File) -> Result<()> + Send + 'static,
    {
        let dest = self.path_for(file_name)?;
        self.ensure_root().await?;

        let lock = self.lock_for(file_name);
        let _guard = lock.lock().await;

        let root = self.root.clone();
        let target = dest.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&root)?;
            fill(tmp.as_file_mut())?;
            tmp.as_file().sync_all()?;
            let replaced = target.exists();
            tmp.persist(&target).map_err(|e| Error::from(e.error))?;
            debug!(dest = %target.display(), replaced, "placed in container");
            Ok(())
        })
        .await
        .map_err(|e| Error::external("container write task failed", e))??;

        Ok(dest)
    }
}

/// Names must be a single normal path component.
fn validate_file_name(file_name: &str) -> Result<()> {
    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(std::path::Component::Normal(_)), None) => Ok(()),
        _ => Err(Error::invalid_input(format!(
            "invalid container file name: {file_name:?}"
        ))),
    }
}
