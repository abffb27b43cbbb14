//! Service layer for the repository.
//!
//! - `resolver`: request path to coordinate
//! - `pom`: POM descriptor extraction
//! - `repository`: deploy/fetch/search orchestration (`RepositoryService`)
//! - `import`: bulk import of a local Maven2 tree

pub mod import;
pub mod pom;
pub mod repository;
pub mod resolver;

pub use import::{ImportPlan, ImportSummary};
pub use repository::{DeployOutcome, FetchedFile, RepositoryService};
pub use resolver::{ResolvedPath, resolve};
