//! Bulk import of a local Maven2 tree.
//!
//! Files are deployed in two phases: primaries (`jar`, `pom`, `xml`) first,
//! then checksum sidecars, so every sidecar is checked against an already
//! cataloged primary. Each phase runs with bounded concurrency.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::FileRole;
use crate::services::RepositoryService;
use crate::utils::fs::{list_files, to_slash_path};

/// Relative paths grouped by deploy phase.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportPlan {
    pub primaries: Vec<PathBuf>,
    pub sidecars: Vec<PathBuf>,
    /// Files without a recognized suffix
    pub skipped: Vec<PathBuf>,
}

impl ImportPlan {
    /// Sort relative paths into phases by their file role.
    pub fn new(files: Vec<PathBuf>) -> Self {
        let mut plan = Self::default();
        for rel in files {
            let role = rel
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(FileRole::from_file_name);
            match role {
                Some(role) if role.is_sidecar() => plan.sidecars.push(rel),
                Some(_) => plan.primaries.push(rel),
                None => plan.skipped.push(rel),
            }
        }
        plan
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RepositoryService {
    /// Deploy every recognized file under `dir`, primaries before sidecars.
    ///
    /// Individual failures are logged and counted, not returned.
    pub async fn import_dir(&self, dir: &Path, max_concurrent: usize) -> Result<ImportSummary> {
        if !dir.is_dir() {
            return Err(AppError::config(format!(
                "Import source {} is not a directory",
                dir.display()
            )));
        }

        let plan = ImportPlan::new(list_files(dir).await?);
        for rel in &plan.skipped {
            log::debug!("Skipping {}", rel.display());
        }
        log::info!(
            "Importing {} primaries and {} sidecars from {} ({} at a time)",
            plan.primaries.len(),
            plan.sidecars.len(),
            dir.display(),
            max_concurrent
        );

        let mut summary = ImportSummary {
            skipped: plan.skipped.len(),
            ..ImportSummary::default()
        };
        for phase in [plan.primaries, plan.sidecars] {
            let imported = self.import_phase(dir, phase, max_concurrent).await;
            summary.imported += imported.iter().filter(|ok| **ok).count();
            summary.failed += imported.iter().filter(|ok| !**ok).count();
        }

        log::info!(
            "Import complete: {} imported, {} failed, {} skipped",
            summary.imported,
            summary.failed,
            summary.skipped
        );
        Ok(summary)
    }

    async fn import_phase(&self, dir: &Path, files: Vec<PathBuf>, max_concurrent: usize) -> Vec<bool> {
        futures::stream::iter(files)
            .map(|rel| async move {
                let repo_path = to_slash_path(&rel);
                let deployed = match tokio::fs::File::open(dir.join(&rel)).await {
                    Ok(mut body) => self.deploy_path(&repo_path, &mut body).await,
                    Err(e) => Err(AppError::Io(e)),
                };
                match deployed {
                    Ok(outcome) => {
                        log::debug!("Imported {}", outcome.stored.path);
                        true
                    }
                    Err(e) => {
                        log::warn!("Failed to import {}: {}", repo_path, e);
                        false
                    }
                }
            })
            .buffer_unordered(max_concurrent.max(1))
            .collect()
            .await
    }
}
