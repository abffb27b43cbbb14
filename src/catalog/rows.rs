//! Row types for SQLx mapping.

use chrono::{DateTime, Utc};

use crate::models::{Artifact, ArtifactFile, FileRole, PomMetadata};

pub(crate) const ARTIFACT_COLUMNS: &str = "id, group_id, artifact_id, version, created_at";

pub(crate) const FILE_COLUMNS: &str = "id, owner_id, file_type, file_path, checksum, size, \
     parent_group_id, parent_artifact_id, parent_version, description, project_url, license, \
     developers, updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct ArtifactRow {
    pub id: i64,
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub created_at: DateTime<Utc>,
}

impl ArtifactRow {
    pub fn into_artifact(self, files: Vec<ArtifactFile>) -> Artifact {
        Artifact {
            id: self.id,
            group_id: self.group_id,
            artifact_id: self.artifact_id,
            version: self.version,
            created_at: self.created_at,
            files,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct FileRow {
    pub id: i64,
    pub owner_id: i64,
    pub file_type: String,
    pub file_path: String,
    pub checksum: String,
    pub size: i64,
    pub parent_group_id: Option<String>,
    pub parent_artifact_id: Option<String>,
    pub parent_version: Option<String>,
    pub description: Option<String>,
    pub project_url: Option<String>,
    pub license: Option<String>,
    pub developers: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl FileRow {
    /// Convert to a domain file, skipping rows with an unknown file type.
    pub fn into_file(self) -> Option<ArtifactFile> {
        let file_type: FileRole = match self.file_type.parse() {
            Ok(role) => role,
            Err(e) => {
                log::warn!(
                    "Skipping artifact file {} with unknown type '{}': {}",
                    self.id,
                    self.file_type,
                    e
                );
                return None;
            }
        };

        Some(self.into_file_with_role(file_type))
    }

    pub fn into_file_with_role(self, file_type: FileRole) -> ArtifactFile {
        ArtifactFile {
            id: self.id,
            owner_id: self.owner_id,
            file_type,
            file_path: self.file_path,
            checksum: self.checksum,
            size: self.size,
            pom: PomMetadata {
                parent_group_id: self.parent_group_id,
                parent_artifact_id: self.parent_artifact_id,
                parent_version: self.parent_version,
                description: self.description,
                project_url: self.project_url,
                license: self.license,
                developers: self.developers,
            },
            updated_at: self.updated_at,
        }
    }
}
