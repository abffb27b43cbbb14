//! Repository service.
//!
//! Orchestrates the resolver, content store, POM extractor and catalog for
//! deploy, fetch and search. Bytes are always made durable in the store
//! before the catalog is touched, so a failed write never leaves a catalog
//! row pointing at missing content.
//!
//! Deploys of the same storage key are serialized from the store write
//! through the catalog commit, so the last file renamed into place is also
//! the last one recorded. Descriptor fields and sidecar digests come from
//! the uploaded bytes, never from a read-back of the store.

use std::sync::Arc;

use tokio::io::AsyncRead;

use crate::catalog::{Catalog, NewArtifactFile, SearchFilter};
use crate::error::{AppError, Result};
use crate::models::{Artifact, ArtifactFile, Config, Coordinate, DigestKind, FileRole, PomMetadata};
use crate::services::{pom, resolver};
use crate::services::resolver::ResolvedPath;
use crate::storage::{ContentStore, LocalStorage, StoredObject, TeeReader, object_key};
use crate::utils::locks::KeyLocks;
use crate::utils::normalize_request_path;

/// Result of a successful deploy.
#[derive(Debug, Clone)]
pub struct DeployOutcome {
    pub coordinate: Coordinate,
    pub stored: StoredObject,
    /// Catalog entry, absent for artifact-level metadata
    pub file: Option<ArtifactFile>,
}

/// Bytes served for a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub file_name: String,
}

/// Deploy/fetch/search over a content store and a catalog.
#[derive(Clone)]
pub struct RepositoryService {
    store: Arc<dyn ContentStore>,
    catalog: Catalog,
    root_marker: String,
    locks: Arc<KeyLocks>,
}

impl RepositoryService {
    pub fn new(store: Arc<dyn ContentStore>, catalog: Catalog) -> Self {
        Self {
            store,
            catalog,
            root_marker: String::new(),
            locks: Arc::new(KeyLocks::new()),
        }
    }

    /// Strip `marker` as the leading segment of raw request paths.
    pub fn with_root_marker(mut self, marker: impl Into<String>) -> Self {
        self.root_marker = marker.into();
        self
    }

    /// Build the service from configuration: local storage plus a migrated
    /// SQLite catalog.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let storage = LocalStorage::with_upload_limit(
            &config.storage.root_dir,
            config.storage.max_upload_bytes,
        );
        let catalog = Catalog::connect(&config.catalog).await?;
        log::info!(
            "Repository rooted at {} (marker '{}')",
            config.storage.root_dir.display(),
            config.repository.root_marker
        );

        Ok(Self::new(Arc::new(storage), catalog).with_root_marker(&config.repository.root_marker))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Normalize a raw request path and resolve it to a coordinate.
    pub fn resolve_path(&self, raw: &str) -> Result<ResolvedPath> {
        let path = normalize_request_path(raw, &self.root_marker)?;
        resolver::resolve(&path)
    }

    /// Deploy the file at a raw request path.
    pub async fn deploy_path(
        &self,
        raw: &str,
        body: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<DeployOutcome> {
        let resolved = self.resolve_path(raw)?;
        self.deploy(resolved.coordinate(), body).await
    }

    /// Deploy an in-memory body.
    pub async fn deploy_bytes(&self, coordinate: &Coordinate, bytes: &[u8]) -> Result<DeployOutcome> {
        let mut body = bytes;
        self.deploy(coordinate, &mut body).await
    }

    /// Store `body` for `coordinate` and record it in the catalog.
    ///
    /// Artifact-level metadata is stored only. POM descriptors are parsed
    /// into catalog fields; a POM that is not well-formed is still stored,
    /// with empty metadata.
    pub async fn deploy(
        &self,
        coordinate: &Coordinate,
        body: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<DeployOutcome> {
        // Rejects unsafe coordinates before any I/O.
        let key = object_key(coordinate)?;
        let _guard = self.locks.acquire(&key).await;

        let inspect = coordinate.version.is_some()
            && (coordinate.role == FileRole::POM
                || coordinate.role.digest == Some(DigestKind::Sha1));
        let (stored, uploaded) = if inspect {
            let mut tee = TeeReader::new(body);
            let stored = self.store.put(coordinate, &mut tee).await?;
            (stored, tee.into_captured())
        } else {
            (self.store.put(coordinate, body).await?, Vec::new())
        };
        log::info!("Stored {} ({} bytes)", coordinate, stored.size);

        let Some(version) = coordinate.version.as_deref() else {
            return Ok(DeployOutcome {
                coordinate: coordinate.clone(),
                stored,
                file: None,
            });
        };

        let pom = if coordinate.role == FileRole::POM {
            extract_pom(coordinate, &uploaded)
        } else {
            PomMetadata::default()
        };

        if coordinate.role.digest == Some(DigestKind::Sha1) {
            if let Err(e) = self.verify_sidecar(coordinate, version, &uploaded).await {
                log::warn!("Could not verify checksum sidecar {}: {}", coordinate, e);
            }
        }

        let (_, file) = self
            .catalog
            .record_file(
                &coordinate.group_id,
                &coordinate.artifact_id,
                version,
                NewArtifactFile {
                    file_type: coordinate.role,
                    file_path: stored.path.clone(),
                    checksum: stored.checksum.clone(),
                    size: stored.size,
                    pom,
                },
            )
            .await?;

        Ok(DeployOutcome {
            coordinate: coordinate.clone(),
            stored,
            file: Some(file),
        })
    }

    /// Compare a sha1 sidecar against the cataloged checksum of its primary.
    async fn verify_sidecar(
        &self,
        coordinate: &Coordinate,
        version: &str,
        body: &[u8],
    ) -> Result<()> {
        let primary_role = coordinate.role.primary_role();
        let Some(artifact) = self
            .catalog
            .find_by_coordinate(&coordinate.group_id, &coordinate.artifact_id, version)
            .await?
        else {
            return Ok(());
        };
        let Some(primary) = artifact.file(primary_role) else {
            return Ok(());
        };

        let text = String::from_utf8_lossy(body);
        let claimed = text
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        if claimed != primary.checksum {
            log::warn!(
                "Checksum sidecar {} says '{}' but stored {} has {}",
                coordinate,
                claimed,
                primary_role,
                primary.checksum
            );
        }
        Ok(())
    }

    /// Fetch the file at a raw request path.
    ///
    /// Versioned files are looked up through the catalog. Artifact-level
    /// metadata is read straight from the store.
    pub async fn fetch_path(&self, raw: &str) -> Result<FetchedFile> {
        match self.resolve_path(raw)? {
            ResolvedPath::Versioned(c) => {
                let version = c.version.as_deref().unwrap_or_default();
                self.fetch(&c.group_id, &c.artifact_id, version, c.role).await
            }
            ResolvedPath::Metadata(c) => {
                let bytes = self.store.get(&c).await?;
                Ok(FetchedFile {
                    bytes,
                    content_type: c.role.content_type(),
                    file_name: c.file_name(),
                })
            }
        }
    }

    /// Fetch a cataloged file by coordinate and role.
    pub async fn fetch(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        role: FileRole,
    ) -> Result<FetchedFile> {
        let gav = format!("{}:{}:{}", group_id, artifact_id, version);
        let artifact = self
            .catalog
            .find_by_coordinate(group_id, artifact_id, version)
            .await?
            .ok_or_else(|| AppError::ArtifactNotFound(gav.clone()))?;
        let file = artifact
            .file(role)
            .ok_or_else(|| AppError::FileNotFound(format!("{} ({})", gav, role)))?;

        let bytes = self
            .store
            .read(&file.file_path)
            .await?
            .ok_or_else(|| AppError::FileNotFound(file.file_path.clone()))?;

        log::debug!("Serving {} ({} bytes)", file.file_path, bytes.len());
        Ok(FetchedFile {
            bytes,
            content_type: role.content_type(),
            file_name: Coordinate::versioned(group_id, artifact_id, version, role).file_name(),
        })
    }

    pub async fn search(&self, filter: &SearchFilter) -> Result<Vec<Artifact>> {
        self.catalog.search(filter).await
    }

    pub async fn search_by_group_id(&self, group_id: &str) -> Result<Vec<Artifact>> {
        self.catalog.search_by_group_id(group_id).await
    }

    pub async fn search_by_artifact_id(&self, artifact_id: &str) -> Result<Vec<Artifact>> {
        self.catalog.search_by_artifact_id(artifact_id).await
    }

    pub async fn search_by_version(&self, version: &str) -> Result<Vec<Artifact>> {
        self.catalog.search_by_version(version).await
    }
}

fn extract_pom(coordinate: &Coordinate, bytes: &[u8]) -> PomMetadata {
    pom::parse(bytes).unwrap_or_else(|e| {
        log::warn!("Storing {} without descriptor fields: {}", coordinate, e);
        PomMetadata::default()
    })
}
