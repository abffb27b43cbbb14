//! Utility functions and helpers.

pub mod fs;
pub mod locks;

use crate::error::{AppError, Result};

/// Normalize a raw request path into a repository-relative path.
///
/// Strips surrounding whitespace and slashes, drops a query string, and
/// removes the leading `root_marker` segment (e.g. `maven2`) when present.
/// Empty, `.` and `..` segments are rejected.
pub fn normalize_request_path(raw: &str, root_marker: &str) -> Result<String> {
    let path = raw.trim();
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    let path = path.trim_matches('/');

    let mut segments: Vec<&str> = path.split('/').collect();
    if !root_marker.is_empty() && segments.first() == Some(&root_marker) {
        segments.remove(0);
    }

    if segments.iter().all(|s| s.is_empty()) {
        return Err(AppError::malformed_path(raw, "empty path"));
    }
    if let Some(bad) = segments
        .iter()
        .find(|s| s.is_empty() || **s == "." || **s == ".." || s.contains('\\'))
    {
        return Err(AppError::malformed_path(
            raw,
            format!("invalid segment '{}'", bad),
        ));
    }

    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_root_marker_and_slashes() {
        assert_eq!(
            normalize_request_path("/maven2/com/example/widget/1.0/widget-1.0.jar", "maven2")
                .unwrap(),
            "com/example/widget/1.0/widget-1.0.jar"
        );
        assert_eq!(
            normalize_request_path(" com/example/widget/maven-metadata.xml/ ", "maven2").unwrap(),
            "com/example/widget/maven-metadata.xml"
        );
    }

    #[test]
    fn test_marker_only_stripped_as_first_segment() {
        assert_eq!(
            normalize_request_path("org/maven2/tool/1.0/tool-1.0.pom", "maven2").unwrap(),
            "org/maven2/tool/1.0/tool-1.0.pom"
        );
    }

    #[test]
    fn test_drops_query_string() {
        assert_eq!(
            normalize_request_path("/maven2/a/b/1.0/b-1.0.jar?download=1", "maven2").unwrap(),
            "a/b/1.0/b-1.0.jar"
        );
    }

    #[test]
    fn test_rejects_traversal_and_empty_segments() {
        assert!(normalize_request_path("com/../etc/1.0/passwd.jar", "maven2").is_err());
        assert!(normalize_request_path("com//widget/1.0/widget-1.0.jar", "maven2").is_err());
        assert!(normalize_request_path("/maven2/", "maven2").is_err());
        assert!(normalize_request_path("", "maven2").is_err());
    }
}
