//! Results of a guarded load and of a dry-run evaluation.

use serde::Serialize;
use uuid::Uuid;

use super::LoadError;
use crate::engine::{DeclaredExtension, DescriptorModel};
use crate::policy::RejectedRepository;
use crate::types::{RepositoryRef, ResolvedFile};

/// Packagings whose lifecycle the engine provides without any extension.
pub const BUILTIN_PACKAGINGS: &[&str] = &["pom", "jar", "war", "ear", "ejb", "rar", "maven-plugin"];

/// The isolated code-loading boundary built for one extension.
///
/// `files` is empty when the code-load gate denied the extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionRealm {
    /// The declaration this realm was built for.
    pub extension: DeclaredExtension,
    /// Files wired into the realm.
    pub files: Vec<ResolvedFile>,
}

impl ExtensionRealm {
    /// Whether the realm holds no code.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn provides(&self, packaging: &str) -> bool {
        self.extension.lifecycles.iter().any(|l| l == packaging)
    }
}

/// Outcome of a successful guarded load.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    /// Id stamped on every decision of this load.
    pub load_id: Uuid,
    /// The raw descriptor, exactly as declared.
    pub descriptor: DescriptorModel,
    /// Declared repositories that passed the repository filter, in
    /// declaration order.
    pub repositories: Vec<RepositoryRef>,
    /// Repositories searched for dependencies: `repositories` followed by the
    /// caller-trusted ones, one entry per URL.
    pub dependency_repositories: Vec<RepositoryRef>,
    /// Repositories approved for extension and plugin resolution.
    pub extension_repositories: Vec<RepositoryRef>,
    /// One realm per declared extension, in declaration order.
    pub extensions: Vec<ExtensionRealm>,
    /// Resolved dependencies, empty unless requested.
    pub dependencies: Vec<ResolvedFile>,
}

impl LoadedProject {
    /// The raw descriptor, including repositories the filter dropped.
    pub fn descriptor(&self) -> &DescriptorModel {
        &self.descriptor
    }

    /// The realm contributing the lifecycle for `packaging`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::UnsatisfiedExtension`] if the contributing
    /// extension was neutralized, or [`LoadError::UnknownLifecycle`] if no
    /// extension contributes it.
    pub fn require_lifecycle(&self, packaging: &str) -> Result<&ExtensionRealm, LoadError> {
        let realm = self
            .extensions
            .iter()
            .find(|realm| realm.provides(packaging))
            .ok_or_else(|| LoadError::UnknownLifecycle {
                packaging: packaging.to_owned(),
            })?;
        if realm.is_empty() {
            return Err(LoadError::UnsatisfiedExtension {
                extension: realm.extension.coordinate.clone(),
                packaging: packaging.to_owned(),
            });
        }
        Ok(realm)
    }

    /// The lifecycle for the project's own packaging.
    ///
    /// `Ok(None)` for built-in packagings.
    ///
    /// # Errors
    ///
    /// Same as [`LoadedProject::require_lifecycle`].
    pub fn project_lifecycle(&self) -> Result<Option<&ExtensionRealm>, LoadError> {
        let packaging = self.descriptor.project.packaging.as_str();
        if BUILTIN_PACKAGINGS.contains(&packaging) {
            return Ok(None);
        }
        self.require_lifecycle(packaging).map(Some)
    }
}

/// Verdict on one declared repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryVerdict {
    /// Declared id.
    pub id: String,
    /// Declared URL.
    pub url: String,
    /// Whether it is usable for dependency resolution.
    pub allowed: bool,
}

/// Verdict on one declared extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionVerdict {
    /// The declaration.
    pub extension: DeclaredExtension,
    /// Whether its code would be admitted.
    pub admitted: bool,
}

/// Dry-run result: what a load would do, without fetching anything.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyReport {
    /// Id stamped on the decisions of this evaluation.
    pub load_id: Uuid,
    /// Project coordinate as `group:artifact:version`.
    pub project: String,
    /// One verdict per declared repository, in declaration order.
    pub repositories: Vec<RepositoryVerdict>,
    /// Every extension or plugin whose repositories were rejected.
    pub rejections: Vec<RejectedRepository>,
    /// One verdict per declared extension.
    pub extensions: Vec<ExtensionVerdict>,
}

impl PolicyReport {
    /// Whether a real load would abort.
    pub fn would_abort(&self) -> bool {
        !self.rejections.is_empty()
    }

    /// Whether nothing at all was blocked.
    pub fn is_clean(&self) -> bool {
        !self.would_abort()
            && self.repositories.iter().all(|r| r.allowed)
            && self.extensions.iter().all(|e| e.admitted)
    }
}
