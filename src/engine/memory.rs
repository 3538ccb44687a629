//! In-memory collaborators for dry runs and tests.
//!
//! [`InMemoryEngine`] records every repository it is asked to contact, which
//! is how callers verify that a rejected repository was never touched.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{
    not_found_or_transport, repository_serves, DescriptorError, DescriptorLoader, DescriptorModel, ResolutionEngine,
    ResolveError,
};
use crate::types::{canonical_url, ArtifactCoordinate, RepositoryRef, ResolvedFile};

/// One repository contact made by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    /// Requested coordinate.
    pub coordinate: ArtifactCoordinate,
    /// Canonical URL contacted.
    pub url: String,
}

/// Resolution engine backed by a map of published artifacts.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    published: HashMap<String, HashMap<String, PathBuf>>,
    unreachable: HashSet<String>,
    attempts: Mutex<Vec<FetchAttempt>>,
}

impl InMemoryEngine {
    /// Empty engine: every resolution fails with not-found.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `coord` available from the repository at `url`.
    pub fn publish(mut self, url: &str, coord: &ArtifactCoordinate, path: impl Into<PathBuf>) -> Self {
        self.published
            .entry(canonical_url(url))
            .or_default()
            .insert(artifact_key(coord), path.into());
        self
    }

    /// Make the repository at `url` fail with a transport error.
    pub fn unreachable(mut self, url: &str) -> Self {
        self.unreachable.insert(canonical_url(url));
        self
    }

    /// Every repository contact so far, in order.
    pub fn attempts(&self) -> Vec<FetchAttempt> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the repository at `url` was ever contacted.
    pub fn contacted(&self, url: &str) -> bool {
        let url = canonical_url(url);
        self.attempts().iter().any(|a| a.url == url)
    }

    fn record(&self, coord: &ArtifactCoordinate, url: &str) {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FetchAttempt {
                coordinate: coord.clone(),
                url: url.to_owned(),
            });
    }
}

#[async_trait]
impl ResolutionEngine for InMemoryEngine {
    async fn resolve_artifact(
        &self,
        coord: &ArtifactCoordinate,
        repos: &[RepositoryRef],
    ) -> Result<ResolvedFile, ResolveError> {
        let key = artifact_key(coord);
        let mut searched = Vec::new();
        let mut transport: Option<ResolveError> = None;
        let mut missed = false;

        for repo in repos.iter().filter(|r| repository_serves(r, coord)) {
            let url = repo.canonical_url();
            self.record(coord, &url);
            searched.push(repo.url.clone());

            if self.unreachable.contains(&url) {
                transport.get_or_insert(ResolveError::Transport {
                    url: repo.url.clone(),
                    message: "connection refused".to_owned(),
                });
                continue;
            }
            if let Some(path) = self.published.get(&url).and_then(|m| m.get(&key)) {
                return Ok(ResolvedFile {
                    coordinate: coord.clone(),
                    path: path.clone(),
                    repository_url: repo.url.clone(),
                });
            }
            missed = true;
        }

        Err(not_found_or_transport(coord, searched, missed, transport))
    }
}

/// Exact artifact identity, including type and classifier.
fn artifact_key(coord: &ArtifactCoordinate) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        coord.group,
        coord.artifact,
        coord.extension(),
        coord.classifier.as_deref().unwrap_or(""),
        coord.version
    )
}

/// Descriptor loader that serves pre-built models by path.
#[derive(Debug, Default)]
pub struct InMemoryDescriptors {
    models: HashMap<PathBuf, DescriptorModel>,
}

impl InMemoryDescriptors {
    /// Empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `model` for `path`.
    pub fn with(mut self, path: impl Into<PathBuf>, model: DescriptorModel) -> Self {
        self.models.insert(path.into(), model);
        self
    }
}

#[async_trait]
impl DescriptorLoader for InMemoryDescriptors {
    async fn load_descriptor(&self, path: &Path) -> Result<DescriptorModel, DescriptorError> {
        self.models
            .get(path)
            .cloned()
            .ok_or_else(|| DescriptorError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such descriptor"),
            })
    }
}
