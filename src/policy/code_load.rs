//! Code-load gate: the last line of defense.
//!
//! Evaluated where an extension's resolved files are wired into the process,
//! independently of what the repository gates decided. A denied extension
//! gets an empty file list; the engine still builds its (empty) realm, and
//! anything that later depends on it fails through the engine's normal
//! "unsatisfied extension" path.

use uuid::Uuid;

use super::allow_list::{AllowList, ExtensionMode};
use super::decision_log::{DecisionLog, Gate, Outcome, PolicyDecision, Reason, Subject};
use crate::types::{ArtifactCoordinate, ResolvedFile};

/// Admits or neutralizes extension code.
#[derive(Debug, Clone, Copy)]
pub struct CodeLoadGate<'a> {
    allow_list: &'a AllowList,
    log: &'a DecisionLog,
    load_id: Uuid,
}

impl<'a> CodeLoadGate<'a> {
    /// Gate bound to one allow-list, log, and load.
    pub fn new(allow_list: &'a AllowList, log: &'a DecisionLog, load_id: Uuid) -> Self {
        Self {
            allow_list,
            log,
            load_id,
        }
    }

    /// Decide whether `coord` may be loaded and record the decision.
    pub fn permits(&self, coord: &ArtifactCoordinate) -> bool {
        let allowed = self.allow_list.is_extension_allowed(coord);
        let (outcome, reason) = match (allowed, self.allow_list.mode()) {
            (true, ExtensionMode::AllowAll) => (Outcome::Allow, Reason::AllowAll),
            (true, ExtensionMode::Enforce) => (Outcome::Allow, Reason::AllowListed),
            (false, _) => (Outcome::Block, Reason::NotAllowListed),
        };

        self.log.record(PolicyDecision::new(
            self.load_id,
            Gate::CodeLoad,
            Subject::Extension(coord.clone()),
            outcome,
            reason,
        ));
        allowed
    }

    /// Return `files` unchanged if `coord` is trusted, else an empty list.
    pub fn admit(&self, coord: &ArtifactCoordinate, files: Vec<ResolvedFile>) -> Vec<ResolvedFile> {
        if self.permits(coord) {
            files
        } else {
            Vec::new()
        }
    }
}
