//! Extension-resolution gate.
//!
//! Runs before the merged repository set exists: the engine must resolve an
//! extension before it can finish building the descriptor that would say
//! which repositories to trust. Any untrusted source at this stage aborts the
//! whole load, because a single fetched byte may end up executing.

use serde::Serialize;
use uuid::Uuid;

use super::allow_list::AllowList;
use super::decision_log::{DecisionLog, Gate, Outcome, PolicyDecision, Reason, Subject};
use crate::types::{ArtifactCoordinate, RepositoryRef};

/// An extension or plugin would have been fetched from an untrusted repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("repository url rejected for extension {extension}: {url}")]
pub struct RejectedRepository {
    /// The untrusted repository URL.
    pub url: String,
    /// The extension that required it.
    pub extension: ArtifactCoordinate,
}

/// Approves the repositories that would supply an extension.
#[derive(Debug, Clone, Copy)]
pub struct ExtensionResolutionGate<'a> {
    allow_list: &'a AllowList,
    log: &'a DecisionLog,
    load_id: Uuid,
}

impl<'a> ExtensionResolutionGate<'a> {
    /// Gate bound to one allow-list, log, and load.
    pub fn new(allow_list: &'a AllowList, log: &'a DecisionLog, load_id: Uuid) -> Self {
        Self {
            allow_list,
            log,
            load_id,
        }
    }

    /// Fail on the first repository whose URL is not allow-listed.
    ///
    /// Only the allow-list is consulted here; caller-trusted repositories are
    /// expected to have been added to it when the boundary was built. Each
    /// repository approved before the first rejection is recorded as an allow.
    ///
    /// # Errors
    ///
    /// Returns [`RejectedRepository`] naming the offending URL.
    pub fn check_extension_repositories(
        &self,
        extension: &ArtifactCoordinate,
        repos: &[RepositoryRef],
    ) -> Result<(), RejectedRepository> {
        for repo in repos {
            let subject = Subject::Repository(repo.url.clone());
            if self.allow_list.is_repository_allowed(&repo.url) {
                self.log.record(PolicyDecision::new(
                    self.load_id,
                    Gate::ExtensionResolution,
                    subject,
                    Outcome::Allow,
                    Reason::AllowListed,
                ));
                continue;
            }
            self.log.record(PolicyDecision::new(
                self.load_id,
                Gate::ExtensionResolution,
                subject,
                Outcome::Block,
                Reason::NotAllowListed,
            ));
            return Err(RejectedRepository {
                url: repo.url.clone(),
                extension: extension.clone(),
            });
        }
        Ok(())
    }
}
