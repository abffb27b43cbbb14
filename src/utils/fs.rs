//! File system utilities.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Recursively list regular files under `root`, as paths relative to it.
///
/// Directory entries are visited in name order so the result is stable.
pub async fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            children.push((entry.path(), entry.file_type().await?));
        }
        children.sort_by(|a, b| a.0.cmp(&b.0));

        for (path, file_type) in children {
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                if let Ok(relative) = path.strip_prefix(root) {
                    files.push(relative.to_path_buf());
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Render a relative filesystem path with `/` separators.
pub fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_list_files_recurses() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("com/example/widget/1.0");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("widget-1.0.jar"), b"jar").unwrap();
        std::fs::write(dir.join("widget-1.0.pom"), b"pom").unwrap();
        std::fs::write(tmp.path().join("com/example/widget/maven-metadata.xml"), b"m").unwrap();

        let files: Vec<String> = list_files(tmp.path())
            .await
            .unwrap()
            .iter()
            .map(|p| to_slash_path(p))
            .collect();

        assert_eq!(
            files,
            vec![
                "com/example/widget/1.0/widget-1.0.jar",
                "com/example/widget/1.0/widget-1.0.pom",
                "com/example/widget/maven-metadata.xml",
            ]
        );
    }
}
