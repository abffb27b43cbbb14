//! # Artifact Catalog
//!
//! Persistent index of artifacts and their files, backed by SQLite via SQLx.
//!
//! Two tables mirror the domain:
//!
//! - `artifacts`: one row per (group_id, artifact_id, version), enforced by a
//!   unique index. Creation is an `INSERT .. ON CONFLICT DO NOTHING` followed
//!   by a read, so concurrent first deploys of a coordinate converge on one row.
//! - `artifact_files`: files owned by an artifact, unique per
//!   (owner_id, file_type). A redeploy of the same role updates the row in
//!   place.
//!
//! The schema lives in `migrations/` and is applied on connect.

mod rows;

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
};
use sqlx::{QueryBuilder, Sqlite};

use crate::error::Result;
use crate::models::{Artifact, ArtifactFile, CatalogConfig, CatalogStats, FileRole, PomMetadata};
use rows::{ARTIFACT_COLUMNS, ArtifactRow, FILE_COLUMNS, FileRow};

/// Upper bound on bound parameters per `IN (..)` list.
const ID_CHUNK: usize = 500;

/// A file to record against an artifact.
#[derive(Debug, Clone)]
pub struct NewArtifactFile {
    pub file_type: FileRole,
    pub file_path: String,
    pub checksum: String,
    pub size: u64,
    pub pom: PomMetadata,
}

/// Substring filters for catalog search. Empty strings are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilter {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
}

/// Artifact catalog over an injected SQLite pool.
#[derive(Debug, Clone)]
pub struct Catalog {
    pool: SqlitePool,
}

impl Catalog {
    /// Wrap an existing pool. The schema must already be migrated.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the configured database, creating it if needed, and migrate.
    pub async fn connect(config: &CatalogConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;
        log::info!("Connected to catalog at {}", config.database_url);

        let catalog = Self::new(pool);
        catalog.migrate().await?;
        Ok(catalog)
    }

    /// Apply embedded migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        log::debug!("Catalog migrations applied");
        Ok(())
    }

    /// Look up an artifact by its coordinate, inserting it if absent.
    pub async fn get_or_create_artifact(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
    ) -> Result<Artifact> {
        let mut conn = self.pool.acquire().await?;
        let row = upsert_artifact(&mut *conn, group_id, artifact_id, version).await?;
        drop(conn);

        let mut artifacts = self.with_files(vec![row]).await?;
        Ok(artifacts.remove(0))
    }

    /// Record a file against an artifact, replacing any file of the same type.
    pub async fn attach_file(
        &self,
        artifact: &Artifact,
        file: NewArtifactFile,
    ) -> Result<ArtifactFile> {
        let mut conn = self.pool.acquire().await?;
        let row = upsert_file(&mut *conn, artifact.id, &file).await?;
        log::info!(
            "Attached {} to {} ({})",
            file.file_type,
            artifact.gav(),
            file.file_path
        );
        Ok(row.into_file_with_role(file.file_type))
    }

    /// Get-or-create the artifact and attach `file` in one transaction.
    ///
    /// Either both rows are committed or neither is.
    pub async fn record_file(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        file: NewArtifactFile,
    ) -> Result<(Artifact, ArtifactFile)> {
        let mut tx = self.pool.begin().await?;
        let artifact_row = upsert_artifact(&mut *tx, group_id, artifact_id, version).await?;
        let file_row = upsert_file(&mut *tx, artifact_row.id, &file).await?;
        tx.commit().await?;

        log::info!(
            "Recorded {} for {}:{}:{} ({})",
            file.file_type,
            group_id,
            artifact_id,
            version,
            file.file_path
        );

        let attached = file_row.into_file_with_role(file.file_type);
        let mut artifacts = self.with_files(vec![artifact_row]).await?;
        Ok((artifacts.remove(0), attached))
    }

    /// Find an artifact by exact coordinate, with its files.
    pub async fn find_by_coordinate(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
    ) -> Result<Option<Artifact>> {
        let sql = format!(
            "SELECT {ARTIFACT_COLUMNS} FROM artifacts
             WHERE group_id = ? AND artifact_id = ? AND version = ?"
        );
        let row = sqlx::query_as::<_, ArtifactRow>(&sql)
            .bind(group_id)
            .bind(artifact_id)
            .bind(version)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.with_files(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Case-sensitive substring search over all three coordinate fields.
    pub async fn search(&self, filter: &SearchFilter) -> Result<Vec<Artifact>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {ARTIFACT_COLUMNS} FROM artifacts WHERE 1 = 1"));

        for (column, value) in [
            ("group_id", &filter.group_id),
            ("artifact_id", &filter.artifact_id),
            ("version", &filter.version),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                // instr() is case-sensitive, unlike LIKE
                qb.push(format!(" AND instr({column}, "))
                    .push_bind(value.to_string())
                    .push(") > 0");
            }
        }
        qb.push(" ORDER BY group_id, artifact_id, version");

        let rows = qb
            .build_query_as::<ArtifactRow>()
            .fetch_all(&self.pool)
            .await?;
        self.with_files(rows).await
    }

    pub async fn search_by_group_id(&self, group_id: &str) -> Result<Vec<Artifact>> {
        self.search(&SearchFilter {
            group_id: Some(group_id.to_string()),
            ..SearchFilter::default()
        })
        .await
    }

    pub async fn search_by_artifact_id(&self, artifact_id: &str) -> Result<Vec<Artifact>> {
        self.search(&SearchFilter {
            artifact_id: Some(artifact_id.to_string()),
            ..SearchFilter::default()
        })
        .await
    }

    pub async fn search_by_version(&self, version: &str) -> Result<Vec<Artifact>> {
        self.search(&SearchFilter {
            version: Some(version.to_string()),
            ..SearchFilter::default()
        })
        .await
    }

    /// Count artifacts and files.
    pub async fn stats(&self) -> Result<CatalogStats> {
        let (artifacts, files): (i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM artifacts), (SELECT COUNT(*) FROM artifact_files)",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(CatalogStats { artifacts, files })
    }

    /// Eagerly load files for a batch of artifact rows, preserving row order.
    async fn with_files(&self, rows: Vec<ArtifactRow>) -> Result<Vec<Artifact>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut by_owner: HashMap<i64, Vec<ArtifactFile>> = HashMap::new();

        for chunk in ids.chunks(ID_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                "SELECT {FILE_COLUMNS} FROM artifact_files WHERE owner_id IN ("
            ));
            let mut separated = qb.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(") ORDER BY owner_id, file_type");

            let files = qb.build_query_as::<FileRow>().fetch_all(&self.pool).await?;
            for file in files.into_iter().filter_map(FileRow::into_file) {
                by_owner.entry(file.owner_id).or_default().push(file);
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let files = by_owner.remove(&row.id).unwrap_or_default();
                row.into_artifact(files)
            })
            .collect())
    }
}

/// Insert the artifact row unless it exists, then read it back.
///
/// The unique index turns a concurrent duplicate insert into a no-op, so
/// every caller reads the same row.
async fn upsert_artifact(
    conn: &mut SqliteConnection,
    group_id: &str,
    artifact_id: &str,
    version: &str,
) -> Result<ArtifactRow> {
    let inserted = sqlx::query(
        "INSERT INTO artifacts (group_id, artifact_id, version, created_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT (group_id, artifact_id, version) DO NOTHING",
    )
    .bind(group_id)
    .bind(artifact_id)
    .bind(version)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if inserted.rows_affected() > 0 {
        log::info!("Cataloged new artifact {}:{}:{}", group_id, artifact_id, version);
    }

    let sql = format!(
        "SELECT {ARTIFACT_COLUMNS} FROM artifacts
         WHERE group_id = ? AND artifact_id = ? AND version = ?"
    );
    let row = sqlx::query_as::<_, ArtifactRow>(&sql)
        .bind(group_id)
        .bind(artifact_id)
        .bind(version)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row)
}

async fn upsert_file(
    conn: &mut SqliteConnection,
    owner_id: i64,
    file: &NewArtifactFile,
) -> Result<FileRow> {
    let size = i64::try_from(file.size).unwrap_or(i64::MAX);
    let sql = format!(
        "INSERT INTO artifact_files (
            owner_id, file_type, file_path, checksum, size,
            parent_group_id, parent_artifact_id, parent_version,
            description, project_url, license, developers, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (owner_id, file_type) DO UPDATE SET
            file_path = excluded.file_path,
            checksum = excluded.checksum,
            size = excluded.size,
            parent_group_id = excluded.parent_group_id,
            parent_artifact_id = excluded.parent_artifact_id,
            parent_version = excluded.parent_version,
            description = excluded.description,
            project_url = excluded.project_url,
            license = excluded.license,
            developers = excluded.developers,
            updated_at = excluded.updated_at
         RETURNING {FILE_COLUMNS}"
    );

    let row = sqlx::query_as::<_, FileRow>(&sql)
        .bind(owner_id)
        .bind(file.file_type.to_string())
        .bind(&file.file_path)
        .bind(&file.checksum)
        .bind(size)
        .bind(&file.pom.parent_group_id)
        .bind(&file.pom.parent_artifact_id)
        .bind(&file.pom.parent_version)
        .bind(&file.pom.description)
        .bind(&file.pom.project_url)
        .bind(&file.pom.license)
        .bind(&file.pom.developers)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DigestKind, PrimaryKind};
    use tempfile::TempDir;

    async fn test_catalog() -> (TempDir, Catalog) {
        let tmp = TempDir::new().unwrap();
        let config = CatalogConfig {
            database_url: format!("sqlite://{}", tmp.path().join("catalog.db").display()),
            max_connections: 5,
        };
        let catalog = Catalog::connect(&config).await.unwrap();
        (tmp, catalog)
    }

    fn new_file(role: FileRole, checksum: &str) -> NewArtifactFile {
        NewArtifactFile {
            file_type: role,
            file_path: format!("com/example/widget/1.0/widget-1.0.{role}"),
            checksum: checksum.to_string(),
            size: 3,
            pom: PomMetadata::default(),
        }
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let (_tmp, catalog) = test_catalog().await;

        let first = catalog
            .get_or_create_artifact("com.example", "widget", "1.0")
            .await
            .unwrap();
        let second = catalog
            .get_or_create_artifact("com.example", "widget", "1.0")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(catalog.stats().await.unwrap().artifacts, 1);
    }

    #[tokio::test]
    async fn test_concurrent_creation_yields_one_row() {
        let (_tmp, catalog) = test_catalog().await;

        let attempts = (0..8).map(|_| {
            let catalog = catalog.clone();
            tokio::spawn(async move {
                catalog
                    .get_or_create_artifact("org.race", "winner", "2.0")
                    .await
                    .map(|a| a.id)
            })
        });
        let ids: Vec<i64> = futures::future::join_all(attempts)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .collect();

        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(catalog.stats().await.unwrap().artifacts, 1);
    }

    #[tokio::test]
    async fn test_attach_file_upserts_by_role() {
        let (_tmp, catalog) = test_catalog().await;
        let artifact = catalog
            .get_or_create_artifact("com.example", "widget", "1.0")
            .await
            .unwrap();

        let first = catalog
            .attach_file(&artifact, new_file(FileRole::POM, "aaa"))
            .await
            .unwrap();

        let mut replacement = new_file(FileRole::POM, "bbb");
        replacement.pom.description = Some("second".into());
        let second = catalog.attach_file(&artifact, replacement).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.checksum, "bbb");

        let found = catalog
            .find_by_coordinate("com.example", "widget", "1.0")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.files.len(), 1);
        let pom = found.file(FileRole::POM).unwrap();
        assert_eq!(pom.checksum, "bbb");
        assert_eq!(pom.pom.description.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_distinct_roles_are_separate_files() {
        let (_tmp, catalog) = test_catalog().await;
        let artifact = catalog
            .get_or_create_artifact("com.example", "widget", "1.0")
            .await
            .unwrap();

        let jar_sha1 = FileRole::sidecar(PrimaryKind::Jar, DigestKind::Sha1);
        for role in [FileRole::JAR, FileRole::POM, jar_sha1] {
            catalog.attach_file(&artifact, new_file(role, "c")).await.unwrap();
        }

        let found = catalog
            .find_by_coordinate("com.example", "widget", "1.0")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.files.len(), 3);
        assert!(found.file(jar_sha1).is_some());
        assert!(found.file(FileRole::XML).is_none());
    }

    #[tokio::test]
    async fn test_find_missing_coordinate() {
        let (_tmp, catalog) = test_catalog().await;
        let found = catalog
            .find_by_coordinate("org.none", "ghost", "1.0")
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_search_is_case_sensitive_substring() {
        let (_tmp, catalog) = test_catalog().await;
        for (g, a, v) in [
            ("com.example", "widget", "1.0"),
            ("com.example", "widget", "2.0-SNAPSHOT"),
            ("com.example", "gadget", "1.0"),
            ("org.other", "Widget", "1.0"),
        ] {
            let artifact = catalog.get_or_create_artifact(g, a, v).await.unwrap();
            catalog
                .attach_file(&artifact, new_file(FileRole::JAR, "x"))
                .await
                .unwrap();
        }

        let by_group = catalog.search_by_group_id("example").await.unwrap();
        assert_eq!(by_group.len(), 3);
        assert!(by_group.iter().all(|a| a.files.len() == 1));

        let by_artifact = catalog.search_by_artifact_id("idget").await.unwrap();
        assert_eq!(by_artifact.len(), 3);
        let exact_case = catalog.search_by_artifact_id("Widget").await.unwrap();
        assert_eq!(exact_case.len(), 1);
        assert_eq!(exact_case[0].group_id, "org.other");

        let snapshots = catalog.search_by_version("SNAPSHOT").await.unwrap();
        assert_eq!(snapshots.len(), 1);
        assert!(catalog.search_by_version("snapshot").await.unwrap().is_empty());

        let combined = catalog
            .search(&SearchFilter {
                group_id: Some("com".into()),
                artifact_id: Some("widget".into()),
                version: Some("".into()),
            })
            .await
            .unwrap();
        let gavs: Vec<String> = combined.iter().map(Artifact::gav).collect();
        assert_eq!(
            gavs,
            vec!["com.example:widget:1.0", "com.example:widget:2.0-SNAPSHOT"]
        );

        let everything = catalog.search(&SearchFilter::default()).await.unwrap();
        assert_eq!(everything.len(), 4);
    }
}
