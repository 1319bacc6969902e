use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use crate::{Result, StorageError, StorageStats};

/// Whole-file byte store rooted at one directory.
///
/// Names are hashed into `objects/<2 hex>/<blake3 hex>` so any file name
/// stays inside the node's namespace.
pub struct StorageEngine {
    storage_path: PathBuf,
    write_lock: Mutex<()>,
}

impl StorageEngine {
    pub async fn new(storage_path: impl AsRef<Path>) -> Result<Self> {
        let storage_path = storage_path.as_ref().to_path_buf();
        fs::create_dir_all(storage_path.join("objects")).await?;

        let engine = Self {
            storage_path,
            write_lock: Mutex::new(()),
        };

        let stats = engine.stats().await?;
        tracing::info!(
            "Storage engine at {:?}: {} files, {} bytes",
            engine.storage_path,
            stats.total_files,
            stats.total_size_bytes
        );

        Ok(engine)
    }

    pub async fn exists(&self, docname: &str) -> Result<bool> {
        Ok(fs::try_exists(self.object_path(docname)).await?)
    }

    pub async fn read(&self, docname: &str) -> Result<Bytes> {
        match fs::read(self.object_path(docname)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound(docname.to_string())),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// Creates or replaces the whole content of `docname`.
    pub async fn write(&self, docname: &str, data: &[u8]) -> Result<()> {
        let path = self.object_path(docname);
        let staging = path.with_extension("tmp");

        let _guard = self.write_lock.lock().await;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        fs::write(&staging, data).await?;
        fs::rename(&staging, &path).await?;

        tracing::debug!("Stored {} ({} bytes)", docname, data.len());
        Ok(())
    }

    pub async fn stats(&self) -> Result<StorageStats> {
        let mut stats = StorageStats::default();
        let objects_dir = self.storage_path.join("objects");

        let mut entries = fs::read_dir(&objects_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let mut sub_entries = fs::read_dir(entry.path()).await?;
            while let Some(sub_entry) = sub_entries.next_entry().await? {
                if sub_entry.path().extension().is_some() {
                    continue;
                }
                let metadata = sub_entry.metadata().await?;
                stats.total_files += 1;
                stats.total_size_bytes += metadata.len();
            }
        }

        Ok(stats)
    }

    fn object_path(&self, docname: &str) -> PathBuf {
        let hash = blake3::hash(docname.as_bytes()).to_hex();
        self.storage_path
            .join("objects")
            .join(&hash[..2])
            .join(hash.as_str())
    }
}
