// src/models/mod.rs

//! Domain models for the repository.
//!
//! Coordinates and file roles describe what a request path addresses;
//! artifacts and artifact files are what the catalog persists.

mod artifact;
mod config;
mod coordinate;

// Re-export all public types
pub use artifact::{Artifact, ArtifactFile, CatalogStats, PomMetadata};
pub use config::{CatalogConfig, Config, LoggingConfig, RepositoryConfig, StorageConfig};
pub use coordinate::{Coordinate, DigestKind, FileRole, PrimaryKind};
