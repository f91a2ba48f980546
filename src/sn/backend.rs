//! The storage backend collaborator (§1 "a storage backend (load/save/stat of an
//! opaque blob keyed by filename)"): a thin `tokio::fs` wrapper over a content
//! directory, in the teacher's `ShadowFS` style (async I/O behind a small trait
//! instead of a direct filesystem dependency scattered through the handlers).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

/// Loads, saves and removes opaque named blobs. The in-memory [`super::state::SnState`]
/// is authoritative for a running process; this trait exists so a file's bytes
/// survive a restart and so tests can swap in a scratch `tempfile` directory.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn save(&self, filename: &str, content: &[u8]) -> std::io::Result<()>;
    async fn load(&self, filename: &str) -> std::io::Result<Vec<u8>>;
    async fn remove(&self, filename: &str) -> std::io::Result<()>;
}

/// Flat-directory backend: one file per blob, named after a sanitised filename.
/// No directory-tree semantics beyond flat names (§6).
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(sanitize(filename))
    }
}

/// Strips path separators so a filename can never escape the content directory.
fn sanitize(filename: &str) -> String {
    filename.replace(['/', '\\'], "_")
}

#[async_trait]
impl StorageBackend for FsBackend {
    async fn save(&self, filename: &str, content: &[u8]) -> std::io::Result<()> {
        fs::create_dir_all(&self.root).await?;
        fs::write(self.path_for(filename), content).await
    }

    async fn load(&self, filename: &str) -> std::io::Result<Vec<u8>> {
        fs::read(self.path_for(filename)).await
    }

    async fn remove(&self, filename: &str) -> std::io::Result<()> {
        match fs::remove_file(self.path_for(filename)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl FsBackend {
    pub fn content_path(&self) -> &Path {
        &self.root
    }
}
