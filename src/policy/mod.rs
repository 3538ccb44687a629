//! Trust-boundary policy: allow-list, gates, and the decision log.
//!
//! Three gates guard the point where code from a repository becomes
//! executable inside the host process:
//!
//! - [`repository_filter`] drops untrusted descriptor repositories from
//!   ordinary dependency resolution (soft rejection),
//! - [`extension_gate`] refuses to resolve extension or plugin code from any
//!   untrusted repository (hard rejection),
//! - [`code_load`] hands the engine an empty file list for extensions that
//!   are not allow-listed, however they were resolved.
//!
//! All three consult the same [`allow_list::AllowList`] and append to the
//! same [`decision_log::DecisionLog`], both owned by a
//! [`boundary::TrustBoundary`]. Each load gets a [`boundary::LoadScope`]
//! that implements the [`RepositoryGate`] and [`ExtensionGate`] capabilities.

use crate::types::{ArtifactCoordinate, RepositoryRef, ResolvedFile};

pub mod allow_list;
pub mod boundary;
pub mod code_load;
pub mod decision_log;
pub mod extension_gate;
pub mod repository_filter;

pub use allow_list::{AllowList, ExtensionMode};
pub use boundary::{LoadScope, TrustBoundary};
pub use code_load::CodeLoadGate;
pub use decision_log::{DecisionLog, Gate, Outcome, PolicyDecision, Reason, Subject};
pub use extension_gate::{ExtensionResolutionGate, RejectedRepository};
pub use repository_filter::RepositoryFilter;

/// Errors from policy configuration and enforcement.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// Extension code would be fetched from an untrusted repository.
    #[error(transparent)]
    RejectedRepository(#[from] RejectedRepository),

    /// The allow-list was modified after the first load began.
    #[error("allow-list is frozen: cannot {operation} after the first load")]
    Frozen {
        /// The rejected mutation, e.g. `allow extension org.example:ext`.
        operation: String,
    },

    /// An extension key is not of the form `group:artifact`.
    #[error("invalid extension key '{0}': expected group:artifact")]
    InvalidExtensionKey(String),

    /// A repository URL could not be parsed.
    #[error("invalid repository url '{url}': {reason}")]
    InvalidRepositoryUrl {
        /// The offending text.
        url: String,
        /// Parser message.
        reason: String,
    },
}

/// Capability that decides which repositories may be used.
///
/// Implemented by [`LoadScope`]; the embedding code builds the
/// [`TrustBoundary`] directly and hands it to the loader.
pub trait RepositoryGate: Send + Sync {
    /// Subset of `declared` usable for ordinary dependency resolution.
    ///
    /// Untrusted entries are dropped silently; input order is preserved.
    fn filter_repositories(
        &self,
        declared: &[RepositoryRef],
        trusted: &[RepositoryRef],
    ) -> Vec<RepositoryRef>;

    /// Approve every repository that would supply `extension`.
    ///
    /// # Errors
    ///
    /// Returns [`RejectedRepository`] naming the first untrusted URL.
    fn check_extension_repositories(
        &self,
        extension: &ArtifactCoordinate,
        repos: &[RepositoryRef],
    ) -> Result<(), RejectedRepository>;
}

/// Capability that decides whether extension code is wired into the process.
pub trait ExtensionGate: Send + Sync {
    /// Return `files` if `coord` is trusted, otherwise an empty list.
    fn admit(&self, coord: &ArtifactCoordinate, files: Vec<ResolvedFile>) -> Vec<ResolvedFile>;
}
