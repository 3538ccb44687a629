//! Boundary with the collaborating resolution and descriptor engine.
//!
//! The policy layer does not resolve or parse anything itself. It consumes
//! a [`ResolutionEngine`] and a [`DescriptorLoader`], and shapes what they
//! are asked to do. Reference implementations live in the submodules.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::types::{ArtifactCoordinate, RepositoryRef, ResolvedFile};

pub mod descriptor;
pub mod filesystem;
pub mod memory;

pub use descriptor::{
    DeclaredExtension, DependencyDeclaration, DescriptorModel, ExtensionDeclaration, ExtensionKind,
    PluginDeclaration, ProjectInfo, TomlDescriptorLoader,
};
pub use filesystem::FileSystemEngine;
pub use memory::{FetchAttempt, InMemoryDescriptors, InMemoryEngine};

/// Errors from artifact resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No repository had the artifact.
    #[error("artifact not found: {coordinate} (searched: {})", searched.join(", "))]
    NotFound {
        /// Requested coordinate.
        coordinate: String,
        /// URLs that were searched, in order.
        searched: Vec<String>,
    },
    /// A repository could not be reached.
    #[error("transport failure for {url}: {message}")]
    Transport {
        /// Repository URL.
        url: String,
        /// Transport message.
        message: String,
    },
}

/// Errors from reading a descriptor.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// The file could not be read.
    #[error("failed to read descriptor {}: {source}", path.display())]
    Io {
        /// Descriptor path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a valid descriptor.
    #[error("failed to parse descriptor {}: {message}", path.display())]
    Parse {
        /// Descriptor path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
}

/// Turns a coordinate and a repository list into a local file.
#[async_trait]
pub trait ResolutionEngine: Send + Sync {
    /// Resolve `coord`, searching `repos` in order.
    async fn resolve_artifact(
        &self,
        coord: &ArtifactCoordinate,
        repos: &[RepositoryRef],
    ) -> Result<ResolvedFile, ResolveError>;
}

/// Turns a descriptor file into the raw, unfiltered project model.
#[async_trait]
pub trait DescriptorLoader: Send + Sync {
    /// Read and parse the descriptor at `path`.
    async fn load_descriptor(&self, path: &Path) -> Result<DescriptorModel, DescriptorError>;
}

/// Final error once every repository has been tried.
///
/// A repository that was reached and lacked the artifact makes the result
/// [`ResolveError::NotFound`]; the transport failure only surfaces when no
/// repository could be searched at all.
pub(crate) fn not_found_or_transport(
    coord: &ArtifactCoordinate,
    searched: Vec<String>,
    missed: bool,
    transport: Option<ResolveError>,
) -> ResolveError {
    match transport {
        Some(err) if !missed => err,
        _ => ResolveError::NotFound {
            coordinate: coord.to_string(),
            searched,
        },
    }
}

/// Whether `repo` serves `coord` according to its release/snapshot policy.
pub fn repository_serves(repo: &RepositoryRef, coord: &ArtifactCoordinate) -> bool {
    if coord.version.ends_with("-SNAPSHOT") {
        repo.snapshots.enabled
    } else {
        repo.releases.enabled
    }
}
