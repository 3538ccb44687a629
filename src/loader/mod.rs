//! Guarded descriptor loading.
//!
//! [`GuardedLoader`] drives the collaborating engine through the three
//! gates in order: repositories are filtered before anything is resolved,
//! every extension and plugin source is approved before any extension code
//! is fetched, and resolved extension code passes the code-load gate before
//! it is wired in.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::TrustConfig;
use crate::engine::{DescriptorError, DescriptorLoader, DescriptorModel, ResolutionEngine, ResolveError};
use crate::policy::{
    ExtensionGate, LoadScope, PolicyDecision, PolicyError, RejectedRepository, RepositoryGate,
    TrustBoundary,
};
use crate::types::{merge_by_url, ArtifactCoordinate, RepositoryRef, ResolvedFile};

pub mod project;

pub use project::{
    ExtensionRealm, ExtensionVerdict, LoadedProject, PolicyReport, RepositoryVerdict,
};

/// Errors from a guarded load.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The descriptor could not be read.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// The load was rejected by policy.
    #[error("descriptor load rejected by policy: {0}")]
    Policy(#[from] PolicyError),

    /// An artifact could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A lifecycle depends on an extension that was not loaded.
    #[error("unsatisfied extension {extension}: lifecycle '{packaging}' is unavailable")]
    UnsatisfiedExtension {
        /// The neutralized extension.
        extension: ArtifactCoordinate,
        /// The requested packaging.
        packaging: String,
    },

    /// No extension contributes the requested lifecycle.
    #[error("no lifecycle available for packaging '{packaging}'")]
    UnknownLifecycle {
        /// The requested packaging.
        packaging: String,
    },
}

impl From<RejectedRepository> for LoadError {
    fn from(rejected: RejectedRepository) -> Self {
        Self::Policy(PolicyError::RejectedRepository(rejected))
    }
}

impl LoadError {
    /// Whether the load was aborted by policy rather than by availability.
    pub fn is_policy_rejection(&self) -> bool {
        matches!(self, Self::Policy(_))
    }

    /// The rejected repository URL, if this is a repository rejection.
    pub fn rejected_url(&self) -> Option<&str> {
        match self {
            Self::Policy(PolicyError::RejectedRepository(r)) => Some(&r.url),
            _ => None,
        }
    }
}

/// Loads descriptors through the trust boundary.
///
/// Share it across tasks with `Arc`; loads take `&self`.
pub struct GuardedLoader {
    boundary: TrustBoundary,
    engine: Arc<dyn ResolutionEngine>,
    descriptors: Arc<dyn DescriptorLoader>,
    trusted: Vec<RepositoryRef>,
    trusted_plugin: Vec<RepositoryRef>,
}

impl std::fmt::Debug for GuardedLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedLoader")
            .field("boundary", &self.boundary)
            .field("trusted", &self.trusted)
            .field("trusted_plugin", &self.trusted_plugin)
            .finish_non_exhaustive()
    }
}

impl GuardedLoader {
    /// Loader with no caller-trusted repositories yet.
    pub fn new(
        boundary: TrustBoundary,
        engine: Arc<dyn ResolutionEngine>,
        descriptors: Arc<dyn DescriptorLoader>,
    ) -> Self {
        Self {
            boundary,
            engine,
            descriptors,
            trusted: Vec::new(),
            trusted_plugin: Vec::new(),
        }
    }

    /// Loader configured from `config`, including its trusted repositories.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed allow-list entries, trusted repository
    /// URLs, or an unopenable audit log.
    pub fn from_config(
        config: &TrustConfig,
        engine: Arc<dyn ResolutionEngine>,
        descriptors: Arc<dyn DescriptorLoader>,
    ) -> anyhow::Result<Self> {
        let mut loader = Self::new(TrustBoundary::from_config(config)?, engine, descriptors);
        loader.trust_repositories(config.trusted_repositories())?;
        loader.trust_plugin_repositories(config.trusted_plugin_repositories())?;
        Ok(loader)
    }

    /// Trust an extension by `group:artifact`. Only before the first load.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Frozen`] after the first load or
    /// [`PolicyError::InvalidExtensionKey`] for a malformed key.
    pub fn allow_extension(&mut self, group_artifact: &str) -> Result<(), PolicyError> {
        self.boundary.allow_extension(group_artifact)
    }

    /// Trust a repository URL. Only before the first load.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Frozen`] after the first load or
    /// [`PolicyError::InvalidRepositoryUrl`] for a malformed URL.
    pub fn allow_repository(&mut self, url: &str) -> Result<(), PolicyError> {
        self.boundary.allow_repository(url)
    }

    /// Add repositories from the caller's own configuration.
    ///
    /// They are always usable for dependency resolution, and their URLs join
    /// the allow-list so extensions may be resolved from them too.
    ///
    /// # Errors
    ///
    /// Same as [`GuardedLoader::allow_repository`].
    pub fn trust_repositories(&mut self, repos: Vec<RepositoryRef>) -> Result<(), PolicyError> {
        self.boundary.trust_repositories(&repos)?;
        self.trusted.extend(repos);
        Ok(())
    }

    /// Add plugin repositories from the caller's own configuration.
    ///
    /// # Errors
    ///
    /// Same as [`GuardedLoader::allow_repository`].
    pub fn trust_plugin_repositories(
        &mut self,
        repos: Vec<RepositoryRef>,
    ) -> Result<(), PolicyError> {
        self.boundary.trust_repositories(&repos)?;
        self.trusted_plugin.extend(repos);
        Ok(())
    }

    /// The trust boundary.
    pub fn boundary(&self) -> &TrustBoundary {
        &self.boundary
    }

    /// Caller-trusted repositories.
    pub fn trusted_repositories(&self) -> &[RepositoryRef] {
        &self.trusted
    }

    /// Caller-trusted plugin repositories.
    pub fn trusted_plugin_repositories(&self) -> &[RepositoryRef] {
        &self.trusted_plugin
    }

    /// Snapshot of every policy decision made so far.
    pub fn decisions(&self) -> Vec<PolicyDecision> {
        self.boundary.decisions()
    }

    /// Read the descriptor at `path` and load it through the gates.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Policy`] when extension code would come from an
    /// untrusted repository, [`LoadError::Resolve`] when an extension or a
    /// requested dependency cannot be resolved, and
    /// [`LoadError::Descriptor`] when the file cannot be read.
    pub async fn load_descriptor(
        &self,
        path: &Path,
        resolve_dependencies: bool,
    ) -> Result<LoadedProject, LoadError> {
        let scope = self.boundary.begin_load();
        let descriptor = self.descriptors.load_descriptor(path).await?;
        self.run(scope, descriptor, resolve_dependencies).await
    }

    /// Load an already parsed descriptor through the gates.
    ///
    /// # Errors
    ///
    /// Same as [`GuardedLoader::load_descriptor`], minus descriptor errors.
    pub async fn load_model(
        &self,
        descriptor: DescriptorModel,
        resolve_dependencies: bool,
    ) -> Result<LoadedProject, LoadError> {
        let scope = self.boundary.begin_load();
        self.run(scope, descriptor, resolve_dependencies).await
    }

    /// Resolve an artifact against the caller-trusted repositories only.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] from the engine.
    pub async fn resolve_artifact(
        &self,
        coord: &ArtifactCoordinate,
    ) -> Result<ResolvedFile, ResolveError> {
        self.engine.resolve_artifact(coord, &self.trusted).await
    }

    /// Run every gate against `descriptor` without fetching anything.
    ///
    /// Unlike a load, evaluation continues past the first rejection so the
    /// report lists every offending extension.
    pub fn evaluate(&self, descriptor: &DescriptorModel) -> PolicyReport {
        let scope = self.boundary.begin_load();
        let usable = scope.filter_repositories(descriptor.declared_repositories(), &self.trusted);
        let repositories = descriptor
            .declared_repositories()
            .iter()
            .map(|repo| RepositoryVerdict {
                id: repo.id.clone(),
                url: repo.url.clone(),
                allowed: usable.iter().any(|u| u.same_url(repo)),
            })
            .collect();

        let extension_repos = descriptor.extension_repositories(&self.trusted_plugin);
        let rejections = executable_coordinates(descriptor)
            .iter()
            .filter_map(|coord| {
                scope
                    .check_extension_repositories(coord, &extension_repos)
                    .err()
            })
            .collect();

        let gate = scope.code_load_gate();
        let extensions = descriptor
            .declared_extensions()
            .into_iter()
            .map(|extension| ExtensionVerdict {
                admitted: gate.permits(&extension.coordinate),
                extension,
            })
            .collect();

        PolicyReport {
            load_id: scope.load_id(),
            project: format!(
                "{}:{}:{}",
                descriptor.project.group, descriptor.project.artifact, descriptor.project.version
            ),
            repositories,
            rejections,
            extensions,
        }
    }

    async fn run(
        &self,
        scope: LoadScope<'_>,
        descriptor: DescriptorModel,
        resolve_dependencies: bool,
    ) -> Result<LoadedProject, LoadError> {
        let load_id = scope.load_id();
        info!(
            load_id = %load_id,
            project = %descriptor.project.artifact,
            "loading descriptor"
        );

        let repositories =
            scope.filter_repositories(descriptor.declared_repositories(), &self.trusted);
        let dependency_repositories = merge_by_url(&repositories, &self.trusted);

        // Approve every source of executable code before fetching any of it.
        let extension_repos = descriptor.extension_repositories(&self.trusted_plugin);
        for coord in executable_coordinates(&descriptor) {
            scope.check_extension_repositories(&coord, &extension_repos)?;
        }

        let mut extensions = Vec::new();
        for extension in descriptor.declared_extensions() {
            let file = self
                .engine
                .resolve_artifact(&extension.coordinate, &extension_repos)
                .await?;
            let files = scope.admit(&extension.coordinate, vec![file]);
            debug!(
                load_id = %load_id,
                extension = %extension.coordinate,
                files = files.len(),
                "extension realm created"
            );
            extensions.push(ExtensionRealm { extension, files });
        }

        let mut dependencies = Vec::new();
        if resolve_dependencies {
            for dependency in descriptor.declared_dependencies() {
                let file = self
                    .engine
                    .resolve_artifact(&dependency.coordinate, &dependency_repositories)
                    .await?;
                dependencies.push(file);
            }
        }

        info!(
            load_id = %load_id,
            repositories = repositories.len(),
            dependency_repositories = dependency_repositories.len(),
            extensions = extensions.len(),
            dependencies = dependencies.len(),
            "descriptor loaded"
        );
        Ok(LoadedProject {
            load_id,
            descriptor,
            repositories,
            dependency_repositories,
            extension_repositories: extension_repos,
            extensions,
            dependencies,
        })
    }
}

/// Coordinates of everything the engine would execute: extensions and plugins.
fn executable_coordinates(descriptor: &DescriptorModel) -> Vec<ArtifactCoordinate> {
    let extensions = descriptor
        .declared_extensions()
        .into_iter()
        .map(|e| e.coordinate);
    let plugins = descriptor
        .declared_plugins()
        .iter()
        .filter(|p| !p.extensions)
        .map(|p| p.coordinate.clone());
    extensions.chain(plugins).collect()
}
