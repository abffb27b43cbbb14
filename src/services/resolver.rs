// src/services/resolver.rs

//! Coordinate resolution for repository paths.
//!
//! A Maven2 path has the shape `group/segments/artifactId/version/file` for
//! artifact files, but metadata files may also sit one level higher, directly
//! under the artifact directory:
//!
//! ```text
//! com/example/widget/1.0/widget-1.0.jar           versioned artifact
//! com/example/widget/1.0/widget-1.0.jar.sha1      versioned sidecar
//! com/example/widget/1.0-SNAPSHOT/maven-metadata.xml  versioned metadata
//! com/example/widget/maven-metadata.xml           artifact-level metadata
//! ```
//!
//! Resolution always assumes the versioned shape first. Only metadata roles
//! are re-checked: when the directory holding a metadata file is not a
//! version string, the path is reinterpreted as artifact-level metadata.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{Coordinate, FileRole, PrimaryKind};

/// Numeric dot-separated version with an optional release qualifier.
static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+(\.\d+)*(-SNAPSHOT|-RC|-RELEASE)?$").expect("version pattern is valid")
});

/// Outcome of resolving a repository path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "coordinate", rename_all = "snake_case")]
pub enum ResolvedPath {
    /// A file under `artifactId/version/`
    Versioned(Coordinate),
    /// A group/artifact-level metadata file with no version directory
    Metadata(Coordinate),
}

impl ResolvedPath {
    pub fn coordinate(&self) -> &Coordinate {
        match self {
            ResolvedPath::Versioned(c) | ResolvedPath::Metadata(c) => c,
        }
    }

    pub fn into_coordinate(self) -> Coordinate {
        match self {
            ResolvedPath::Versioned(c) | ResolvedPath::Metadata(c) => c,
        }
    }

    pub fn is_metadata(&self) -> bool {
        matches!(self, ResolvedPath::Metadata(_))
    }
}

/// Whether a directory name looks like a Maven version.
pub fn is_maven_version(candidate: &str) -> bool {
    VERSION_PATTERN.is_match(candidate)
}

/// Resolve a normalized repository path (no leading/trailing slashes, root
/// marker removed) into a coordinate.
pub fn resolve(path: &str) -> Result<ResolvedPath> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() < 3 {
        return Err(AppError::malformed_path(
            path,
            format!("expected at least 3 segments, found {}", segments.len()),
        ));
    }
    if let Some(bad) = segments
        .iter()
        .find(|s| s.is_empty() || **s == "." || **s == "..")
    {
        return Err(AppError::malformed_path(
            path,
            format!("invalid path segment '{}'", bad),
        ));
    }

    let n = segments.len();
    let file_name = segments[n - 1];
    let role = FileRole::from_file_name(file_name)
        .ok_or_else(|| AppError::UnsupportedExtension(file_name.to_string()))?;

    let version = segments[n - 2];
    if role.primary == PrimaryKind::Xml && !is_maven_version(version) {
        // `.../groupId/artifactId/maven-metadata.xml`
        let artifact_id = segments[n - 2];
        let group = &segments[..n - 2];
        return Ok(ResolvedPath::Metadata(Coordinate::metadata(
            group.join("."),
            artifact_id,
            role,
        )));
    }

    let artifact_id = segments[n - 3];
    let group = &segments[..n - 3];
    if group.is_empty() {
        return Err(AppError::malformed_path(path, "missing groupId segments"));
    }

    Ok(ResolvedPath::Versioned(Coordinate::versioned(
        group.join("."),
        artifact_id,
        version,
        role,
    )))
}
