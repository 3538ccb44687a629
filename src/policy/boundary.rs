//! Owner of the allow-list and decision log for one engine instance.

use tracing::info;
use uuid::Uuid;

use super::allow_list::AllowList;
use super::code_load::CodeLoadGate;
use super::decision_log::{DecisionLog, PolicyDecision};
use super::extension_gate::{ExtensionResolutionGate, RejectedRepository};
use super::repository_filter::RepositoryFilter;
use super::{ExtensionGate, PolicyError, RepositoryGate};
use crate::config::TrustConfig;
use crate::types::{ArtifactCoordinate, RepositoryRef, ResolvedFile};

/// The trust boundary of one engine instance.
///
/// Configuration methods take `&mut self` and are rejected once the first
/// load has begun. Loads take `&self` and may run concurrently.
#[derive(Debug)]
pub struct TrustBoundary {
    allow_list: AllowList,
    log: DecisionLog,
}

impl TrustBoundary {
    /// Wrap an allow-list and a decision log.
    pub fn new(allow_list: AllowList, log: DecisionLog) -> Self {
        Self { allow_list, log }
    }

    /// Build from configuration, opening the audit sink if one is configured.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed allow-list entries or an unopenable
    /// audit log.
    pub fn from_config(config: &TrustConfig) -> anyhow::Result<Self> {
        let allow_list = AllowList::from_config(config)?;
        let log = match &config.audit.log_path {
            Some(path) => DecisionLog::open(path)?,
            None => DecisionLog::new(),
        };
        Ok(Self::new(allow_list, log))
    }

    /// Trust an extension by `group:artifact`.
    ///
    /// # Errors
    ///
    /// See [`AllowList::allow_extension`].
    pub fn allow_extension(&mut self, group_artifact: &str) -> Result<(), PolicyError> {
        self.allow_list.allow_extension(group_artifact)
    }

    /// Trust a repository URL.
    ///
    /// # Errors
    ///
    /// See [`AllowList::allow_repository`].
    pub fn allow_repository(&mut self, url: &str) -> Result<(), PolicyError> {
        self.allow_list.allow_repository(url)
    }

    /// Trust the URLs of repositories taken from the caller's configuration.
    ///
    /// # Errors
    ///
    /// See [`AllowList::allow_repository`].
    pub fn trust_repositories(&mut self, repos: &[RepositoryRef]) -> Result<(), PolicyError> {
        for repo in repos {
            self.allow_list.allow_repository(&repo.url)?;
        }
        Ok(())
    }

    /// The allow-list.
    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// The decision log.
    pub fn decision_log(&self) -> &DecisionLog {
        &self.log
    }

    /// Snapshot of all decisions.
    pub fn decisions(&self) -> Vec<PolicyDecision> {
        self.log.decisions()
    }

    /// Freeze the allow-list and open a scope for one load.
    pub fn begin_load(&self) -> LoadScope<'_> {
        if self.allow_list.freeze() {
            info!("allow-list frozen");
        }
        LoadScope {
            allow_list: &self.allow_list,
            log: &self.log,
            load_id: Uuid::new_v4(),
        }
    }
}

/// The three gates, bound to a single load.
#[derive(Debug, Clone, Copy)]
pub struct LoadScope<'a> {
    allow_list: &'a AllowList,
    log: &'a DecisionLog,
    load_id: Uuid,
}

impl<'a> LoadScope<'a> {
    /// Id stamped on every decision made in this scope.
    pub fn load_id(&self) -> Uuid {
        self.load_id
    }

    /// Repository filter for this load.
    pub fn repository_filter(&self) -> RepositoryFilter<'a> {
        RepositoryFilter::new(self.allow_list, self.log, self.load_id)
    }

    /// Extension-resolution gate for this load.
    pub fn extension_gate(&self) -> ExtensionResolutionGate<'a> {
        ExtensionResolutionGate::new(self.allow_list, self.log, self.load_id)
    }

    /// Code-load gate for this load.
    pub fn code_load_gate(&self) -> CodeLoadGate<'a> {
        CodeLoadGate::new(self.allow_list, self.log, self.load_id)
    }
}

impl RepositoryGate for LoadScope<'_> {
    fn filter_repositories(
        &self,
        declared: &[RepositoryRef],
        trusted: &[RepositoryRef],
    ) -> Vec<RepositoryRef> {
        self.repository_filter().filter(declared, trusted)
    }

    fn check_extension_repositories(
        &self,
        extension: &ArtifactCoordinate,
        repos: &[RepositoryRef],
    ) -> Result<(), RejectedRepository> {
        self.extension_gate()
            .check_extension_repositories(extension, repos)
    }
}

impl ExtensionGate for LoadScope<'_> {
    fn admit(&self, coord: &ArtifactCoordinate, files: Vec<ResolvedFile>) -> Vec<ResolvedFile> {
        self.code_load_gate().admit(coord, files)
    }
}
