use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::utils::error::Result;

/// File-backed storage for small named blobs of text. The tracker
/// reads and writes its whole state file through this seam, so tests
/// can point it at a temp directory.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Full contents of the named entry; empty string when absent.
    async fn read_all(&self, name: &str) -> Result<String>;

    /// Replaces the named entry in one atomic overwrite.
    async fn write_all(&self, name: &str, content: &str) -> Result<()>;

    async fn delete(&self, name: &str) -> Result<()>;
}

/// Stores each entry as a plain file under a root directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn read_all(&self, name: &str) -> Result<String> {
        match tokio::fs::read_to_string(self.path_for(name)).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, name: &str, content: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        // Write to a unique sibling temp file and rename so a
        // concurrent reader or writer never sees a partial entry.
        let path = self.path_for(name);
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let tmp = self.path_for(&format!("{name}.{nonce}.tmp"));
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!("wrote {} bytes to {}", content.len(), path.display());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
