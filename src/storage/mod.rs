//! Content storage for artifact bytes.
//!
//! Files are laid out in the standard Maven2 tree:
//!
//! ```text
//! {root}/
//! └── com/example/widget/
//!     ├── maven-metadata.xml           # artifact-level metadata
//!     ├── maven-metadata.xml.sha1
//!     └── 1.0/
//!         ├── widget-1.0.jar
//!         ├── widget-1.0.jar.sha1
//!         ├── widget-1.0.pom
//!         └── maven-metadata.xml       # versioned metadata
//! ```

pub mod local;

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use async_trait::async_trait;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::{AppError, Result};
use crate::models::Coordinate;

// Re-export for convenience
pub use local::LocalStorage;

/// Result of a completed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Key relative to the storage root, `/`-separated
    pub path: String,
    /// SHA-1 of the bytes written, lowercase hex
    pub checksum: String,
    /// Number of bytes written
    pub size: u64,
}

/// Trait for content storage backends.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Stream `body` into the location for `coordinate`, replacing any
    /// previous content atomically.
    async fn put(
        &self,
        coordinate: &Coordinate,
        body: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<StoredObject>;

    /// Read the bytes stored for `coordinate`.
    ///
    /// Fails with `FileNotFound` when nothing is stored there.
    async fn get(&self, coordinate: &Coordinate) -> Result<Vec<u8>> {
        let key = object_key(coordinate)?;
        self.read(&key)
            .await?
            .ok_or_else(|| AppError::FileNotFound(key))
    }

    /// Read bytes by storage key, returning None if absent.
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Whether anything is stored for `coordinate`.
    async fn exists(&self, coordinate: &Coordinate) -> Result<bool>;
}

/// Storage key for a coordinate.
///
/// Rejects coordinates whose components would escape their directory.
pub fn object_key(coordinate: &Coordinate) -> Result<String> {
    let mut segments: Vec<&str> = coordinate.group_id.split('.').collect();
    segments.push(&coordinate.artifact_id);
    if let Some(version) = &coordinate.version {
        segments.push(version);
    }

    if let Some(bad) = segments.iter().find(|s| !is_safe_segment(s)) {
        return Err(AppError::malformed_path(
            coordinate.to_string(),
            format!("invalid coordinate component '{}'", bad),
        ));
    }

    Ok(format!("{}/{}", segments.join("/"), coordinate.file_name()))
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
}

/// Reader that keeps a copy of everything read through it.
///
/// Lets a caller inspect exactly the bytes a `put` consumed without reading
/// the stored object back.
pub struct TeeReader<'a> {
    inner: &'a mut (dyn AsyncRead + Unpin + Send),
    captured: Vec<u8>,
}

impl<'a> TeeReader<'a> {
    pub fn new(inner: &'a mut (dyn AsyncRead + Unpin + Send)) -> Self {
        Self {
            inner,
            captured: Vec::new(),
        }
    }

    pub fn into_captured(self) -> Vec<u8> {
        self.captured
    }
}

impl AsyncRead for TeeReader<'_> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = &mut *self;
        let before = buf.filled().len();
        ready!(Pin::new(&mut *this.inner).poll_read(cx, buf))?;
        this.captured.extend_from_slice(&buf.filled()[before..]);
        Poll::Ready(Ok(()))
    }
}

/// SHA-1 of a byte slice, lowercase hex.
pub fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DigestKind, FileRole, PrimaryKind};

    #[test]
    fn test_object_key_layout() {
        let jar = Coordinate::versioned("com.example", "widget", "1.0", FileRole::JAR);
        assert_eq!(object_key(&jar).unwrap(), "com/example/widget/1.0/widget-1.0.jar");

        let pom_sha = jar.with_role(FileRole::sidecar(PrimaryKind::Pom, DigestKind::Sha1));
        assert_eq!(
            object_key(&pom_sha).unwrap(),
            "com/example/widget/1.0/widget-1.0.pom.sha1"
        );

        let versioned_meta = jar.with_role(FileRole::XML);
        assert_eq!(
            object_key(&versioned_meta).unwrap(),
            "com/example/widget/1.0/maven-metadata.xml"
        );

        let meta = Coordinate::metadata(
            "com.example",
            "widget",
            FileRole::sidecar(PrimaryKind::Xml, DigestKind::Md5),
        );
        assert_eq!(
            object_key(&meta).unwrap(),
            "com/example/widget/maven-metadata.xml.md5"
        );
    }

    #[test]
    fn test_object_key_rejects_escapes() {
        let bad = Coordinate::versioned("com..evil", "widget", "1.0", FileRole::JAR);
        assert!(object_key(&bad).is_err());

        let bad = Coordinate::versioned("com.example", "../widget", "1.0", FileRole::JAR);
        assert!(object_key(&bad).is_err());

        let bad = Coordinate::versioned("com.example", "widget", "..", FileRole::JAR);
        assert!(object_key(&bad).is_err());

        let bad = Coordinate::versioned("", "widget", "1.0", FileRole::JAR);
        assert!(object_key(&bad).is_err());
    }

    #[test]
    fn test_sha1_known_vectors() {
        assert_eq!(sha1_hex(b""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(sha1_hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[tokio::test]
    async fn test_tee_reader_captures_what_was_read() {
        use tokio::io::AsyncReadExt;

        let mut source: &[u8] = b"<project/>";
        let mut tee = TeeReader::new(&mut source);
        let mut out = Vec::new();
        tee.read_to_end(&mut out).await.unwrap();

        assert_eq!(out, b"<project/>");
        assert_eq!(tee.into_captured(), b"<project/>");
    }

    #[test]
    fn test_sha1_deterministic_and_distinct() {
        assert_eq!(sha1_hex(b"artifact"), sha1_hex(b"artifact"));
        assert_ne!(sha1_hex(b"artifact-1"), sha1_hex(b"artifact-2"));
    }
}
