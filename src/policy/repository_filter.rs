//! Repository filter for ordinary dependency resolution.
//!
//! Failure mode is a silent drop: resolving against a repository that was
//! never trusted can only end in "artifact not found", never in code running.

use uuid::Uuid;

use super::allow_list::AllowList;
use super::decision_log::{DecisionLog, Gate, Outcome, PolicyDecision, Reason, Subject};
use crate::types::RepositoryRef;

/// Filters descriptor repositories down to the trusted subset.
#[derive(Debug, Clone, Copy)]
pub struct RepositoryFilter<'a> {
    allow_list: &'a AllowList,
    log: &'a DecisionLog,
    load_id: Uuid,
}

impl<'a> RepositoryFilter<'a> {
    /// Filter bound to one allow-list, log, and load.
    pub fn new(allow_list: &'a AllowList, log: &'a DecisionLog, load_id: Uuid) -> Self {
        Self {
            allow_list,
            log,
            load_id,
        }
    }

    /// Keep each declared repository whose URL is trusted.
    ///
    /// A repository is trusted when its URL appears in `trusted` (the
    /// caller's own configuration) or in the allow-list. Order is preserved
    /// and nothing is added.
    pub fn filter(&self, declared: &[RepositoryRef], trusted: &[RepositoryRef]) -> Vec<RepositoryRef> {
        declared
            .iter()
            .filter(|repo| self.evaluate(repo, trusted))
            .cloned()
            .collect()
    }

    fn evaluate(&self, repo: &RepositoryRef, trusted: &[RepositoryRef]) -> bool {
        let (outcome, reason) = if trusted.iter().any(|t| t.same_url(repo)) {
            (Outcome::Allow, Reason::TrustedExternal)
        } else if self.allow_list.is_repository_allowed(&repo.url) {
            (Outcome::Allow, Reason::AllowListed)
        } else {
            (Outcome::Block, Reason::NotAllowListed)
        };

        self.log.record(PolicyDecision::new(
            self.load_id,
            Gate::RepositoryFilter,
            Subject::Repository(repo.url.clone()),
            outcome,
            reason,
        ));
        outcome == Outcome::Allow
    }
}
