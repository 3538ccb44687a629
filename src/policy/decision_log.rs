//! Append-only record of every allow/block decision.
//!
//! Each decision is kept in memory for inspection, emitted as a structured
//! `tracing` event, and optionally written as one JSON line to an audit sink.
//! The log is observational only: nothing reads it to make a decision.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::types::ArtifactCoordinate;

/// What a decision was about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    /// An extension or plugin coordinate.
    Extension(ArtifactCoordinate),
    /// A repository, by URL.
    Repository(String),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extension(coord) => write!(f, "{coord}"),
            Self::Repository(url) => write!(f, "{url}"),
        }
    }
}

/// Allow or block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The subject passed the gate.
    Allow,
    /// The subject was dropped, rejected, or neutralized.
    Block,
}

/// Which gate made the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    /// Ordinary dependency-resolution repository filter.
    RepositoryFilter,
    /// Repository check before extension/plugin resolution.
    ExtensionResolution,
    /// Final admit/deny where code is wired into the process.
    CodeLoad,
}

/// Why a decision was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// Repository comes from the caller's own configuration.
    TrustedExternal,
    /// Subject is on the allow-list.
    AllowListed,
    /// Extension enforcement is switched off.
    AllowAll,
    /// Subject is not on the allow-list.
    NotAllowListed,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::TrustedExternal => "trusted external repository",
            Self::AllowListed => "allow-listed",
            Self::AllowAll => "extension enforcement disabled",
            Self::NotAllowListed => "not allow-listed",
        };
        f.write_str(text)
    }
}

/// A single policy decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyDecision {
    /// Load operation that triggered the decision.
    pub load_id: Uuid,
    /// Deciding gate.
    pub gate: Gate,
    /// Coordinate or URL decided on.
    pub subject: Subject,
    /// Allow or block.
    pub outcome: Outcome,
    /// Why.
    pub reason: Reason,
    /// When.
    pub timestamp: DateTime<Utc>,
}

impl PolicyDecision {
    /// Build a decision stamped with the current time.
    pub fn new(load_id: Uuid, gate: Gate, subject: Subject, outcome: Outcome, reason: Reason) -> Self {
        Self {
            load_id,
            gate,
            subject,
            outcome,
            reason,
            timestamp: Utc::now(),
        }
    }

    /// Whether this is a block.
    pub fn is_block(&self) -> bool {
        self.outcome == Outcome::Block
    }
}

struct Inner {
    entries: Vec<PolicyDecision>,
    sink: Option<Box<dyn Write + Send>>,
}

/// Concurrency-safe, append-only decision log.
///
/// Uses a sync [`Mutex`]; the critical section never awaits.
pub struct DecisionLog {
    inner: Mutex<Inner>,
}

impl fmt::Debug for DecisionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("DecisionLog")
            .field("entries", &inner.entries.len())
            .field("sink", &inner.sink.is_some())
            .finish()
    }
}

impl Default for DecisionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionLog {
    /// In-memory log without an audit sink.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: Vec::new(),
                sink: None,
            }),
        }
    }

    /// Log that also writes JSON lines to `writer`.
    pub fn with_sink(writer: Box<dyn Write + Send>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: Vec::new(),
                sink: Some(writer),
            }),
        }
    }

    /// Log that appends JSON lines to the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened for appending.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!("failed to create audit directory {}: {e}", parent.display())
            })?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| anyhow::anyhow!("failed to open audit log {}: {e}", path.display()))?;
        Ok(Self::with_sink(Box::new(file)))
    }

    /// Append a decision.
    pub fn record(&self, decision: PolicyDecision) {
        match decision.outcome {
            Outcome::Allow => info!(
                load_id = %decision.load_id,
                gate = ?decision.gate,
                subject = %decision.subject,
                reason = %decision.reason,
                "policy allowed"
            ),
            Outcome::Block => warn!(
                load_id = %decision.load_id,
                gate = ?decision.gate,
                subject = %decision.subject,
                reason = %decision.reason,
                "policy blocked"
            ),
        }

        let mut inner = self.lock();
        if let Some(sink) = inner.sink.as_mut() {
            if let Err(e) = write_line(&mut **sink, &decision) {
                warn!(error = %e, "failed to write decision to audit sink");
            }
        }
        inner.entries.push(decision);
    }

    /// Snapshot of every decision so far, in append order.
    pub fn decisions(&self) -> Vec<PolicyDecision> {
        self.lock().entries.clone()
    }

    /// Decisions made during one load.
    pub fn decisions_for_load(&self, load_id: Uuid) -> Vec<PolicyDecision> {
        self.lock()
            .entries
            .iter()
            .filter(|d| d.load_id == load_id)
            .cloned()
            .collect()
    }

    /// Number of recorded decisions.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Extensions admitted by the code-load gate, as `group:artifact:version`.
    pub fn allowed_extensions(&self) -> Vec<String> {
        self.extensions_with(Outcome::Allow)
    }

    /// Extensions neutralized by the code-load gate, as `group:artifact:version`.
    pub fn blocked_extensions(&self) -> Vec<String> {
        self.extensions_with(Outcome::Block)
    }

    /// Repository URLs blocked by either repository gate.
    pub fn blocked_repositories(&self) -> Vec<String> {
        self.lock()
            .entries
            .iter()
            .filter(|d| d.is_block())
            .filter_map(|d| match &d.subject {
                Subject::Repository(url) => Some(url.clone()),
                Subject::Extension(_) => None,
            })
            .collect()
    }

    fn extensions_with(&self, outcome: Outcome) -> Vec<String> {
        self.lock()
            .entries
            .iter()
            .filter(|d| d.gate == Gate::CodeLoad && d.outcome == outcome)
            .filter_map(|d| match &d.subject {
                Subject::Extension(coord) => {
                    Some(format!("{}:{}:{}", coord.group, coord.artifact, coord.version))
                }
                Subject::Repository(_) => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Entries are only ever pushed whole, so a poisoned lock still holds
        // a consistent vector.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn write_line(sink: &mut dyn Write, decision: &PolicyDecision) -> anyhow::Result<()> {
    let line = serde_json::to_string(decision)?;
    writeln!(sink, "{line}")?;
    sink.flush()?;
    Ok(())
}
