//! Maven coordinates and file roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Primary kind of a stored file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimaryKind {
    Jar,
    Pom,
    /// `maven-metadata.xml`
    Xml,
}

impl PrimaryKind {
    pub fn extension(&self) -> &'static str {
        match self {
            PrimaryKind::Jar => "jar",
            PrimaryKind::Pom => "pom",
            PrimaryKind::Xml => "xml",
        }
    }
}

/// Digest carried by a checksum sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestKind {
    Sha1,
    Md5,
}

impl DigestKind {
    pub fn extension(&self) -> &'static str {
        match self {
            DigestKind::Sha1 => "sha1",
            DigestKind::Md5 => "md5",
        }
    }
}

/// Semantic kind of a file: a primary kind plus an optional sidecar digest.
///
/// The digest, when present, always describes a file of the same primary
/// kind: `jar.sha1` is the checksum of a `jar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct FileRole {
    pub primary: PrimaryKind,
    pub digest: Option<DigestKind>,
}

/// Recognized suffixes, compound forms first.
///
/// Lookup walks this table in order, so a compound suffix such as
/// `pom.sha1` is always matched before any simple one.
const ROLE_SUFFIXES: [(&str, FileRole); 9] = [
    ("pom.sha1", FileRole::sidecar(PrimaryKind::Pom, DigestKind::Sha1)),
    ("pom.md5", FileRole::sidecar(PrimaryKind::Pom, DigestKind::Md5)),
    ("xml.sha1", FileRole::sidecar(PrimaryKind::Xml, DigestKind::Sha1)),
    ("xml.md5", FileRole::sidecar(PrimaryKind::Xml, DigestKind::Md5)),
    ("jar.sha1", FileRole::sidecar(PrimaryKind::Jar, DigestKind::Sha1)),
    ("jar.md5", FileRole::sidecar(PrimaryKind::Jar, DigestKind::Md5)),
    ("xml", FileRole::primary(PrimaryKind::Xml)),
    ("jar", FileRole::primary(PrimaryKind::Jar)),
    ("pom", FileRole::primary(PrimaryKind::Pom)),
];

impl FileRole {
    pub const JAR: FileRole = FileRole::primary(PrimaryKind::Jar);
    pub const POM: FileRole = FileRole::primary(PrimaryKind::Pom);
    pub const XML: FileRole = FileRole::primary(PrimaryKind::Xml);

    pub const fn primary(kind: PrimaryKind) -> Self {
        Self {
            primary: kind,
            digest: None,
        }
    }

    pub const fn sidecar(kind: PrimaryKind, digest: DigestKind) -> Self {
        Self {
            primary: kind,
            digest: Some(digest),
        }
    }

    /// Detect the role from a file name by its suffix (case-insensitive).
    ///
    /// The suffix must be preceded by a `.` and a non-empty stem.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_ascii_lowercase();
        ROLE_SUFFIXES.iter().find_map(|(suffix, role)| {
            lower
                .strip_suffix(suffix)
                .and_then(|rest| rest.strip_suffix('.'))
                .filter(|stem| !stem.is_empty())
                .map(|_| *role)
        })
    }

    /// Whether this role is a checksum sidecar.
    pub fn is_sidecar(&self) -> bool {
        self.digest.is_some()
    }

    /// The role of the file this sidecar describes (or itself).
    pub fn primary_role(&self) -> FileRole {
        FileRole::primary(self.primary)
    }

    /// Full extension, e.g. `jar` or `pom.sha1`.
    pub fn extension(&self) -> String {
        match self.digest {
            Some(digest) => format!("{}.{}", self.primary.extension(), digest.extension()),
            None => self.primary.extension().to_string(),
        }
    }

    /// Content type used when serving a file of this role.
    pub fn content_type(&self) -> &'static str {
        if self.is_sidecar() {
            return "text/plain";
        }
        match self.primary {
            PrimaryKind::Jar => "application/octet-stream",
            PrimaryKind::Pom | PrimaryKind::Xml => "application/xml",
        }
    }
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension())
    }
}

impl FromStr for FileRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ROLE_SUFFIXES
            .iter()
            .find(|(suffix, _)| suffix.eq_ignore_ascii_case(s))
            .map(|(_, role)| *role)
            .ok_or_else(|| AppError::UnsupportedExtension(s.to_string()))
    }
}

impl From<FileRole> for String {
    fn from(role: FileRole) -> Self {
        role.extension()
    }
}

impl TryFrom<String> for FileRole {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A resolved repository coordinate.
///
/// `version` is absent for group/artifact-level metadata files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub role: FileRole,
}

impl Coordinate {
    pub fn versioned(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        role: FileRole,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: Some(version.into()),
            role,
        }
    }

    pub fn metadata(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        role: FileRole,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: None,
            role,
        }
    }

    pub fn is_metadata(&self) -> bool {
        self.version.is_none()
    }

    /// Same coordinate, different role.
    pub fn with_role(&self, role: FileRole) -> Self {
        Self {
            role,
            ..self.clone()
        }
    }

    /// Canonical file name: `{artifactId}-{version}.{ext}` for artifacts,
    /// `maven-metadata.{ext}` for metadata files.
    pub fn file_name(&self) -> String {
        match (&self.version, self.role.primary) {
            (Some(version), PrimaryKind::Jar | PrimaryKind::Pom) => {
                format!("{}-{}.{}", self.artifact_id, version, self.role)
            }
            _ => format!("maven-metadata.{}", self.role),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        if let Some(version) = &self.version {
            write!(f, ":{}", version)?;
        }
        write!(f, " ({})", self.role)
    }
}
