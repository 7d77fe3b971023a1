//! Directory-backed blob store for uploaded assets and job outputs.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::{Error, Result};

/// Result of an idempotent delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed,
    AlreadyAbsent,
}

/// Extension used when an upload carries no usable one.
pub const FALLBACK_EXTENSION: &str = "bin";

/// Reduce a client-supplied file name to a safe lowercase extension.
pub fn sanitize_extension(file_name: Option<&str>) -> String {
    let ext: String = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(10)
        .collect::<String>()
        .to_ascii_lowercase();
    if ext.is_empty() {
        FALLBACK_EXTENSION.to_string()
    } else {
        ext
    }
}

/// `path` resolved against the working directory, without touching the
/// filesystem.
pub fn absolute_path(path: impl Into<PathBuf>) -> PathBuf {
    let path = path.into();
    std::path::absolute(&path).unwrap_or(path)
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// A store rooted at `root`, made absolute.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: absolute_path(root),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if it does not exist yet.
    pub async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Error::io_path("creating storage directory", &self.root, e))
    }

    /// Location of the blob owned by `id`.
    pub fn output_path(&self, id: &str, extension: &str) -> PathBuf {
        self.root.join(format!("{id}.{extension}"))
    }

    /// Store `bytes` as the blob owned by `id`.
    pub async fn create(&self, id: &str, extension: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.output_path(id, extension);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::io_path("writing blob", &path, e))?;
        debug!(path = %path.display(), size = bytes.len(), "Stored blob");
        Ok(path)
    }

    /// Store a chunked body as the blob owned by `id`.
    ///
    /// A partially written file is removed when the stream fails.
    pub async fn create_from_stream<S, E>(
        &self,
        id: &str,
        extension: &str,
        stream: S,
    ) -> Result<PathBuf>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let path = self.output_path(id, extension);
        match self.write_stream(&path, stream).await {
            Ok(size) => {
                debug!(path = %path.display(), size, "Stored streamed blob");
                Ok(path)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&path).await;
                Err(e)
            }
        }
    }

    async fn write_stream<S, E>(&self, path: &Path, stream: S) -> Result<u64>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| Error::io_path("creating blob", path, e))?;
        let mut stream = std::pin::pin!(stream);
        let mut size = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::validation(format!("upload interrupted: {e}")))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io_path("writing blob", path, e))?;
            size += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| Error::io_path("flushing blob", path, e))?;
        Ok(size)
    }

    pub async fn read(&self, path: &Path) -> Result<Bytes> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| Error::io_path("reading blob", path, e))?;
        Ok(Bytes::from(data))
    }

    /// Delete a blob. A missing file is not an error.
    pub async fn delete(&self, path: &Path) -> Result<DeleteOutcome> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(DeleteOutcome::Removed),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DeleteOutcome::AlreadyAbsent),
            Err(e) => Err(Error::io_path("deleting blob", path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_relative_root_is_made_absolute() {
        let store = BlobStore::new("./storage");
        assert!(store.root().is_absolute());
        assert!(store.root().ends_with("storage"));
        assert!(
            !store
                .root()
                .components()
                .any(|c| c == std::path::Component::CurDir)
        );
        assert!(store.output_path("id", "mp4").is_absolute());
    }

    #[test]
    fn test_sanitize_extension() {
        assert_eq!(sanitize_extension(Some("clip.MP4")), "mp4");
        assert_eq!(sanitize_extension(Some("../../etc/passwd")), "bin");
        assert_eq!(sanitize_extension(Some("a.we/ird")), "bin");
        assert_eq!(sanitize_extension(None), "bin");
    }

    #[tokio::test]
    async fn test_create_read_delete() {
        let dir = TempDir::new().unwrap();
        let store = BlobStore::new(dir.path());

        let path = store.create("abc", "txt", b"hello").await.unwrap();
        assert_eq!(path, dir.path().join("abc.txt"));
        assert_eq!(store.read(&path).await.unwrap(), Bytes::from_static(b"hello"));

        assert_eq!(store.delete(&path).await.unwrap(), DeleteOutcome::Removed);
        assert_eq!(
            store.delete(&path).await.unwrap(),
            DeleteOutcome::AlreadyAbsent
        );
    }

    #[tokio::test]
    async fn test_create_from_stream() {
        let dir = TempDir::new().unwrap();
        let store = BlobStore::new(dir.path());
        let chunks = futures::stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"ab")),
            Ok(Bytes::from_static(b"cd")),
        ]);

        let path = store.create_from_stream("s", "bin", chunks).await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"abcd");
    }

    #[tokio::test]
    async fn test_failed_stream_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let store = BlobStore::new(dir.path());
        let chunks = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"ab")),
            Err(std::io::Error::other("reset")),
        ]);

        let err = store.create_from_stream("s", "bin", chunks).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(!dir.path().join("s.bin").exists());
    }
}
