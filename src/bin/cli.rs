//! maven-repo CLI
//!
//! Local entry point for deploying, fetching and searching artifacts.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use maven_repo::{
    catalog::SearchFilter,
    config::load_config,
    error::Result,
    models::Config,
    services::{RepositoryService, resolver},
    storage::object_key,
    utils::normalize_request_path,
};
use tokio::io::AsyncWriteExt;

/// maven-repo - Maven2 artifact repository
#[derive(Parser, Debug)]
#[command(name = "maven-repo", version, about = "Maven2-layout artifact repository")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "repository.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deploy a local file at a repository path
    Deploy {
        /// Repository path, e.g. maven2/com/example/widget/1.0/widget-1.0.jar
        path: String,
        /// File to upload
        file: PathBuf,
    },

    /// Fetch a file by repository path
    Fetch {
        path: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show how a repository path resolves
    Resolve { path: String },

    /// Search the catalog (case-sensitive substring match)
    Search {
        #[arg(long)]
        group_id: Option<String>,
        #[arg(long)]
        artifact_id: Option<String>,
        #[arg(long)]
        version: Option<String>,
    },

    /// Deploy every recognized file under a local Maven2 tree
    Import { dir: PathBuf },

    /// Validate configuration
    Validate,

    /// Show catalog statistics
    Info,
}

/// Initialize logging; `--verbose` wins over the configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_logging(cli.verbose, &config.logging.level);

    if cli.config.exists() {
        log::debug!("Loaded configuration from {}", cli.config.display());
    } else {
        log::warn!("Config file {} not found, using defaults", cli.config.display());
    }

    match &cli.command {
        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
            return Ok(());
        }

        Command::Resolve { path } => return resolve(&config, path),

        _ => {}
    }

    config.validate()?;
    let service = RepositoryService::from_config(&config).await?;

    match cli.command {
        Command::Deploy { path, file } => {
            let mut body = tokio::fs::File::open(&file).await?;
            let outcome = service.deploy_path(&path, &mut body).await?;
            log::info!(
                "Deployed {} -> {} (sha1 {})",
                file.display(),
                outcome.stored.path,
                outcome.stored.checksum
            );
        }

        Command::Fetch { path, output } => {
            let fetched = service.fetch_path(&path).await?;
            match output {
                Some(out) => {
                    tokio::fs::write(&out, &fetched.bytes).await?;
                    log::info!(
                        "Wrote {} ({}, {} bytes) to {}",
                        fetched.file_name,
                        fetched.content_type,
                        fetched.bytes.len(),
                        out.display()
                    );
                }
                None => {
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&fetched.bytes).await?;
                    stdout.flush().await?;
                }
            }
        }

        Command::Search {
            group_id,
            artifact_id,
            version,
        } => {
            let filter = SearchFilter {
                group_id,
                artifact_id,
                version,
            };
            let artifacts = service.search(&filter).await?;
            log::debug!("Search matched {} artifacts", artifacts.len());
            println!("{}", serde_json::to_string_pretty(&artifacts)?);
        }

        Command::Import { dir } => {
            let summary = service
                .import_dir(&dir, config.repository.max_concurrent)
                .await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Info => {
            let stats = service.catalog().stats().await?;
            log::info!("Storage root: {}", config.storage.root_dir.display());
            log::info!("Catalog: {}", config.catalog.database_url);
            log::info!("Artifacts: {}", stats.artifacts);
            log::info!("Files: {}", stats.files);
        }

        Command::Validate | Command::Resolve { .. } => {}
    }

    Ok(())
}

/// Print the coordinate, storage key and content type for a path.
fn resolve(config: &Config, raw: &str) -> Result<()> {
    let path = normalize_request_path(raw, &config.repository.root_marker)?;
    let resolved = resolver::resolve(&path)?;
    let coordinate = resolved.coordinate();

    let report = serde_json::json!({
        "resolved": &resolved,
        "storage_key": object_key(coordinate)?,
        "content_type": coordinate.role.content_type(),
        "file_name": coordinate.file_name(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
