//! Allow-list store: trusted extension keys and trusted repository URLs.
//!
//! Built once per engine instance, then frozen when the first load begins.
//! Mutation takes `&mut self`, so it cannot race with evaluation; the runtime
//! freeze flag additionally rejects configuration that arrives after a load
//! has already been evaluated against the list.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use super::PolicyError;
use crate::config::TrustConfig;
use crate::types::{canonical_url, ArtifactCoordinate, GroupArtifact, DEFAULT_REPOSITORY_URL};

/// How extension keys are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionMode {
    /// Only allow-listed `group:artifact` keys are admitted.
    Enforce,
    /// Every extension is admitted. Explicit opt-out of enforcement.
    AllowAll,
}

/// Trusted extension keys and repository URLs.
#[derive(Debug)]
pub struct AllowList {
    mode: ExtensionMode,
    extensions: BTreeSet<GroupArtifact>,
    repositories: BTreeSet<String>,
    frozen: AtomicBool,
}

impl AllowList {
    /// Create an allow-list with no extension keys (deny-all under
    /// [`ExtensionMode::Enforce`]).
    ///
    /// When `seed_default_repository` is true the default public repository
    /// URL is trusted; otherwise repository trust starts empty.
    pub fn new(mode: ExtensionMode, seed_default_repository: bool) -> Self {
        let mut repositories = BTreeSet::new();
        if seed_default_repository {
            repositories.insert(canonical_url(DEFAULT_REPOSITORY_URL));
        }
        Self {
            mode,
            extensions: BTreeSet::new(),
            repositories,
            frozen: AtomicBool::new(false),
        }
    }

    /// Enforcing allow-list seeded with the default public repository.
    pub fn seeded() -> Self {
        Self::new(ExtensionMode::Enforce, true)
    }

    /// Enforcing allow-list that trusts nothing at all.
    pub fn empty() -> Self {
        Self::new(ExtensionMode::Enforce, false)
    }

    /// Build from configuration.
    ///
    /// Application order: default seed, environment-supplied comma lists,
    /// then the config file's explicit entries.
    ///
    /// # Errors
    ///
    /// Returns an error if any extension key or repository URL is malformed.
    pub fn from_config(config: &TrustConfig) -> Result<Self, PolicyError> {
        let mode = if config.extensions.enforce {
            ExtensionMode::Enforce
        } else {
            ExtensionMode::AllowAll
        };
        let mut list = Self::new(mode, config.repositories.seed_default);

        if let Some(csv) = &config.extensions.env_allow {
            list.allow_extensions_csv(csv)?;
        }
        if let Some(csv) = &config.repositories.env_allow {
            list.allow_repositories_csv(csv)?;
        }
        for key in &config.extensions.allow {
            list.allow_extension(key)?;
        }
        for url in &config.repositories.allow {
            list.allow_repository(url)?;
        }

        info!(
            mode = ?list.mode,
            extensions = ?list.extension_keys(),
            repositories = ?list.repository_urls(),
            "allow-list created"
        );
        Ok(list)
    }

    /// Trust an extension by `group:artifact`. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Frozen`] after the first load, or
    /// [`PolicyError::InvalidExtensionKey`] for a malformed key.
    pub fn allow_extension(&mut self, key: &str) -> Result<(), PolicyError> {
        self.ensure_mutable(|| format!("allow extension {key}"))?;
        let parsed: GroupArtifact = key
            .parse()
            .map_err(|_| PolicyError::InvalidExtensionKey(key.to_owned()))?;
        debug!(extension = %parsed, "extension allow-listed");
        self.extensions.insert(parsed);
        Ok(())
    }

    /// Trust a repository by URL. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Frozen`] after the first load, or
    /// [`PolicyError::InvalidRepositoryUrl`] if the URL does not parse.
    pub fn allow_repository(&mut self, url: &str) -> Result<(), PolicyError> {
        self.ensure_mutable(|| format!("allow repository {url}"))?;
        url::Url::parse(url.trim()).map_err(|e| PolicyError::InvalidRepositoryUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
        let canonical = canonical_url(url);
        debug!(url = %canonical, "repository allow-listed");
        self.repositories.insert(canonical);
        Ok(())
    }

    /// Trust every extension key in a comma-separated list.
    ///
    /// Blank entries are skipped and entries are trimmed.
    ///
    /// # Errors
    ///
    /// Same as [`AllowList::allow_extension`].
    pub fn allow_extensions_csv(&mut self, csv: &str) -> Result<(), PolicyError> {
        for entry in split_csv(csv) {
            self.allow_extension(entry)?;
        }
        Ok(())
    }

    /// Trust every repository URL in a comma-separated list.
    ///
    /// # Errors
    ///
    /// Same as [`AllowList::allow_repository`].
    pub fn allow_repositories_csv(&mut self, csv: &str) -> Result<(), PolicyError> {
        for entry in split_csv(csv) {
            self.allow_repository(entry)?;
        }
        Ok(())
    }

    /// Freeze the list. Returns `true` if this call performed the freeze.
    pub fn freeze(&self) -> bool {
        !self.frozen.swap(true, Ordering::AcqRel)
    }

    /// Whether the list has been frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Extension enforcement mode.
    pub fn mode(&self) -> ExtensionMode {
        self.mode
    }

    /// Whether `coord` may be loaded. The version is ignored.
    pub fn is_extension_allowed(&self, coord: &ArtifactCoordinate) -> bool {
        match self.mode {
            ExtensionMode::AllowAll => true,
            ExtensionMode::Enforce => coord
                .group_artifact()
                .map(|key| self.extensions.contains(&key))
                .unwrap_or(false),
        }
    }

    /// Whether `url` is in the trusted repository set.
    pub fn is_repository_allowed(&self, url: &str) -> bool {
        self.repositories.contains(&canonical_url(url))
    }

    /// Allow-listed extension keys, or `None` in allow-all mode.
    pub fn extension_keys(&self) -> Option<Vec<String>> {
        match self.mode {
            ExtensionMode::AllowAll => None,
            ExtensionMode::Enforce => {
                Some(self.extensions.iter().map(ToString::to_string).collect())
            }
        }
    }

    /// Trusted repository URLs in canonical form.
    pub fn repository_urls(&self) -> Vec<String> {
        self.repositories.iter().cloned().collect()
    }

    fn ensure_mutable(&self, operation: impl FnOnce() -> String) -> Result<(), PolicyError> {
        if self.is_frozen() {
            return Err(PolicyError::Frozen {
                operation: operation(),
            });
        }
        Ok(())
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::seeded()
    }
}

fn split_csv(csv: &str) -> impl Iterator<Item = &str> {
    csv.split(',').map(str::trim).filter(|entry| !entry.is_empty())
}
