//! Local filesystem storage implementation.
//!
//! Every write streams into a uniquely named `.part` file next to its target,
//! is synced to disk, and is then renamed over the target. Readers see
//! either the previous file or the complete new one, never a torn write.
//! Concurrent writes to the same key are last-rename-wins.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::error::{AppError, Result};
use crate::models::Coordinate;
use crate::storage::{ContentStore, StoredObject, object_key};

/// Distinguishes concurrent temp files within this process.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

const CHUNK_SIZE: usize = 64 * 1024;

/// Default upload ceiling (100 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    max_upload_bytes: u64,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self::with_upload_limit(root_dir, DEFAULT_MAX_UPLOAD_BYTES)
    }

    /// Create a LocalStorage that rejects uploads larger than `max_upload_bytes`.
    pub fn with_upload_limit(root_dir: impl Into<PathBuf>, max_upload_bytes: u64) -> Self {
        Self {
            root_dir: root_dir.into(),
            max_upload_bytes,
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn temp_path(path: &Path) -> PathBuf {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        path.with_file_name(format!(".{}.{}-{}.part", file_name, std::process::id(), seq))
    }

    /// Stream `body` into `tmp`, hashing as it goes.
    async fn write_temp(
        &self,
        tmp: &Path,
        body: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<(String, u64)> {
        let mut file = tokio::fs::File::create(tmp).await?;
        let mut hasher = Sha1::new();
        let mut size: u64 = 0;
        let mut buf = vec![0u8; CHUNK_SIZE];

        loop {
            let n = body.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            size += n as u64;
            if size > self.max_upload_bytes {
                return Err(AppError::PayloadTooLarge {
                    limit: self.max_upload_bytes,
                });
            }
            hasher.update(&buf[..n]);
            file.write_all(&buf[..n]).await?;
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok((hex::encode(hasher.finalize()), size))
    }

    /// Write a stream atomically (write to temp, then rename).
    async fn write_stream(
        &self,
        key: &str,
        body: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<(String, u64)> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = Self::temp_path(&path);
        let written = match self.write_temp(&tmp, body).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AppError::Io(e));
        }
        sync_parent_dir(&path).await;

        Ok(written)
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

/// Persist the rename itself.
#[cfg(unix)]
async fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = tokio::fs::File::open(parent).await {
            if let Err(e) = dir.sync_all().await {
                log::debug!("Directory sync failed for {}: {}", parent.display(), e);
            }
        }
    }
}

#[cfg(not(unix))]
async fn sync_parent_dir(_path: &Path) {}

#[async_trait]
impl ContentStore for LocalStorage {
    async fn put(
        &self,
        coordinate: &Coordinate,
        body: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<StoredObject> {
        let key = object_key(coordinate)?;
        let (checksum, size) = self.write_stream(&key, body).await?;
        log::debug!("Stored {} bytes at {} (sha1 {})", size, key, checksum);

        Ok(StoredObject {
            path: key,
            checksum,
            size,
        })
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if key.split('/').any(|s| s.is_empty() || s == "." || s == "..") {
            return Err(AppError::malformed_path(key, "invalid storage key"));
        }
        self.read_bytes(key).await
    }

    async fn exists(&self, coordinate: &Coordinate) -> Result<bool> {
        let key = object_key(coordinate)?;
        Ok(tokio::fs::try_exists(self.path(&key)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileRole;
    use crate::storage::sha1_hex;
    use tempfile::TempDir;

    fn jar() -> Coordinate {
        Coordinate::versioned("com.example", "widget", "1.0", FileRole::JAR)
    }

    async fn put_bytes(storage: &LocalStorage, coordinate: &Coordinate, bytes: &[u8]) -> Result<StoredObject> {
        let mut body = bytes;
        storage.put(coordinate, &mut body).await
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let stored = put_bytes(&storage, &jar(), b"jar-bytes").await.unwrap();
        assert_eq!(stored.path, "com/example/widget/1.0/widget-1.0.jar");
        assert_eq!(stored.checksum, sha1_hex(b"jar-bytes"));
        assert_eq!(stored.size, 9);

        assert!(tmp.path().join("com/example/widget/1.0/widget-1.0.jar").exists());
        assert_eq!(storage.get(&jar()).await.unwrap(), b"jar-bytes");
        assert!(storage.exists(&jar()).await.unwrap());
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let err = storage.get(&jar()).await.unwrap_err();
        assert!(matches!(err, AppError::FileNotFound(_)));
        assert!(!storage.exists(&jar()).await.unwrap());
        assert_eq!(storage.read("com/example/none.jar").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        put_bytes(&storage, &jar(), b"first version, longer").await.unwrap();
        put_bytes(&storage, &jar(), b"second").await.unwrap();

        assert_eq!(storage.get(&jar()).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_upload_limit_leaves_previous_content() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::with_upload_limit(tmp.path(), 8);

        put_bytes(&storage, &jar(), b"small").await.unwrap();
        let err = put_bytes(&storage, &jar(), b"far too large").await.unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge { limit: 8 }));

        assert_eq!(storage.get(&jar()).await.unwrap(), b"small");
        let leftovers: Vec<_> = std::fs::read_dir(tmp.path().join("com/example/widget/1.0"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_writes_never_tear() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let a = vec![b'a'; 300_000];
        let b = vec![b'b'; 200_000];
        let coordinate = jar();

        let (ra, rb) = tokio::join!(
            put_bytes(&storage, &coordinate, &a),
            put_bytes(&storage, &coordinate, &b)
        );
        ra.unwrap();
        rb.unwrap();

        let stored = storage.get(&jar()).await.unwrap();
        assert!(stored == a || stored == b);
    }

    #[tokio::test]
    async fn test_read_rejects_traversal_keys() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        assert!(storage.read("../outside.jar").await.is_err());
    }
}
