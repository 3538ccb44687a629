//! Resolution engine for `file://` repositories.
//!
//! Uses the conventional layout
//! `group/as/path/artifact/version/artifact-version[-classifier].type`.
//! There is no network transport: other schemes count as transport failures,
//! reported only when no `file://` repository could be searched.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::{not_found_or_transport, repository_serves, ResolutionEngine, ResolveError};
use crate::types::{ArtifactCoordinate, RepositoryRef, ResolvedFile};

/// Resolves artifacts from local directory repositories.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemEngine;

impl FileSystemEngine {
    /// Create the engine.
    pub fn new() -> Self {
        Self
    }
}

/// Relative path of `coord` inside a repository.
pub fn layout_path(coord: &ArtifactCoordinate) -> PathBuf {
    let mut path = PathBuf::new();
    for segment in coord.group.split('.') {
        path.push(segment);
    }
    path.push(&coord.artifact);
    path.push(&coord.version);
    let file_name = match &coord.classifier {
        Some(classifier) => format!(
            "{}-{}-{classifier}.{}",
            coord.artifact,
            coord.version,
            coord.extension()
        ),
        None => format!("{}-{}.{}", coord.artifact, coord.version, coord.extension()),
    };
    path.push(file_name);
    path
}

fn repository_root(repo: &RepositoryRef) -> Result<PathBuf, ResolveError> {
    let transport = |message: String| ResolveError::Transport {
        url: repo.url.clone(),
        message,
    };
    let parsed = Url::parse(repo.url.trim()).map_err(|e| transport(e.to_string()))?;
    if parsed.scheme() != "file" {
        return Err(transport(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    parsed
        .to_file_path()
        .map_err(|()| transport("not a local path".to_owned()))
}

#[async_trait]
impl ResolutionEngine for FileSystemEngine {
    async fn resolve_artifact(
        &self,
        coord: &ArtifactCoordinate,
        repos: &[RepositoryRef],
    ) -> Result<ResolvedFile, ResolveError> {
        let relative = layout_path(coord);
        let mut searched = Vec::new();
        let mut transport: Option<ResolveError> = None;
        let mut missed = false;

        for repo in repos.iter().filter(|r| repository_serves(r, coord)) {
            searched.push(repo.url.clone());
            let root = match repository_root(repo) {
                Ok(root) => root,
                Err(e) => {
                    debug!(url = %repo.url, error = %e, "skipping repository");
                    transport.get_or_insert(e);
                    continue;
                }
            };
            let candidate = root.join(&relative);
            let found = tokio::fs::metadata(&candidate)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if found {
                debug!(coordinate = %coord, path = %candidate.display(), "artifact resolved");
                return Ok(ResolvedFile {
                    coordinate: coord.clone(),
                    path: candidate,
                    repository_url: repo.url.clone(),
                });
            }
            missed = true;
        }

        Err(not_found_or_transport(coord, searched, missed, transport))
    }
}
