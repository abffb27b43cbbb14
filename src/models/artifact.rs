//! Catalog entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::coordinate::FileRole;

/// A cataloged artifact, unique by (group_id, artifact_id, version).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    /// Surrogate key
    pub id: i64,

    pub group_id: String,

    pub artifact_id: String,

    pub version: String,

    /// First successful deploy
    pub created_at: DateTime<Utc>,

    /// Files deployed under this coordinate, at most one per role
    #[serde(default)]
    pub files: Vec<ArtifactFile>,
}

impl Artifact {
    /// Find the file stored for a role.
    pub fn file(&self, role: FileRole) -> Option<&ArtifactFile> {
        self.files.iter().find(|f| f.file_type == role)
    }

    /// `group:artifact:version` form.
    pub fn gav(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

/// A file belonging to an artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactFile {
    pub id: i64,

    /// Owning artifact's surrogate key
    pub owner_id: i64,

    pub file_type: FileRole,

    /// Location in the content store, relative to its root
    pub file_path: String,

    /// SHA-1 of the uploaded bytes, lowercase hex
    pub checksum: String,

    pub size: i64,

    /// Descriptor fields (populated for `pom` files only)
    #[serde(flatten)]
    pub pom: PomMetadata,

    pub updated_at: DateTime<Utc>,
}

/// Flat descriptor metadata extracted from a POM.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PomMetadata {
    pub parent_group_id: Option<String>,
    pub parent_artifact_id: Option<String>,
    pub parent_version: Option<String>,
    pub description: Option<String>,
    pub project_url: Option<String>,
    pub license: Option<String>,
    /// Comma-joined developer names
    pub developers: Option<String>,
}

impl PomMetadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Catalog size summary.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct CatalogStats {
    pub artifacts: i64,
    pub files: i64,
}
