//! Core data types shared by the policy layer and the engine boundary.
//!
//! Artifact coordinates are compared by `group:artifact` only; repositories
//! are compared by canonical URL only. Neither the version of an artifact nor
//! the id of a repository participates in a trust decision.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// URL of the well-known default public repository.
///
/// Seeded into every allow-list built with `seed_default_repository = true`.
pub const DEFAULT_REPOSITORY_URL: &str = "https://repo.maven.apache.org/maven2";

/// Id under which the default public repository is declared.
pub const DEFAULT_REPOSITORY_ID: &str = "central";

/// Errors from parsing coordinates and keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Coordinate string does not have 3 to 5 colon-separated parts.
    #[error("invalid artifact coordinate '{0}': expected group:artifact[:type[:classifier]]:version")]
    Coordinate(String),
    /// Extension key is not `group:artifact`.
    #[error("invalid extension key '{0}': expected group:artifact")]
    GroupArtifact(String),
}

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// The `group:artifact` pair that identifies an artifact for policy purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupArtifact {
    group: String,
    artifact: String,
}

impl GroupArtifact {
    /// Build a key from its two parts.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::GroupArtifact`] if either part is empty or
    /// contains whitespace or a colon.
    pub fn new(group: &str, artifact: &str) -> Result<Self, ParseError> {
        if !is_valid_part(group) || !is_valid_part(artifact) {
            return Err(ParseError::GroupArtifact(format!("{group}:{artifact}")));
        }
        Ok(Self {
            group: group.to_owned(),
            artifact: artifact.to_owned(),
        })
    }

    /// Group id.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Artifact id.
    pub fn artifact(&self) -> &str {
        &self.artifact
    }
}

impl fmt::Display for GroupArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)
    }
}

impl FromStr for GroupArtifact {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.split_once(':') {
            Some((group, artifact)) => {
                Self::new(group, artifact).map_err(|_| ParseError::GroupArtifact(s.to_owned()))
            }
            None => Err(ParseError::GroupArtifact(s.to_owned())),
        }
    }
}

impl Serialize for GroupArtifact {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GroupArtifact {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

fn is_valid_part(part: &str) -> bool {
    !part.is_empty() && !part.contains(':') && !part.chars().any(char::is_whitespace)
}

/// A fully qualified artifact coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactCoordinate {
    /// Group id.
    pub group: String,
    /// Artifact id.
    pub artifact: String,
    /// Version string, never consulted by policy.
    pub version: String,
    /// Optional classifier (e.g. `sources`).
    pub classifier: Option<String>,
    /// Optional packaging type; `jar` when absent.
    pub kind: Option<String>,
}

impl ArtifactCoordinate {
    /// Build a coordinate without classifier or type.
    pub fn new(group: &str, artifact: &str, version: &str) -> Self {
        Self {
            group: group.to_owned(),
            artifact: artifact.to_owned(),
            version: version.to_owned(),
            classifier: None,
            kind: None,
        }
    }

    /// Return the same coordinate with a different version.
    pub fn with_version(&self, version: &str) -> Self {
        Self {
            version: version.to_owned(),
            ..self.clone()
        }
    }

    /// Packaging type, defaulting to `jar`.
    pub fn extension(&self) -> &str {
        self.kind.as_deref().unwrap_or("jar")
    }

    /// Policy key for this coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::GroupArtifact`] when group or artifact is malformed.
    pub fn group_artifact(&self) -> Result<GroupArtifact, ParseError> {
        GroupArtifact::new(&self.group, &self.artifact)
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)?;
        match (&self.kind, &self.classifier) {
            (Some(kind), Some(classifier)) => write!(f, ":{kind}:{classifier}")?,
            (None, Some(classifier)) => write!(f, ":jar:{classifier}")?,
            (Some(kind), None) => write!(f, ":{kind}")?,
            (None, None) => {}
        }
        write!(f, ":{}", self.version)
    }
}

impl FromStr for ArtifactCoordinate {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(ParseError::Coordinate(s.to_owned()));
        }
        let (group, artifact, kind, classifier, version) = match parts.as_slice() {
            [g, a, v] => (*g, *a, None, None, *v),
            [g, a, t, v] => (*g, *a, Some(*t), None, *v),
            [g, a, t, c, v] => (*g, *a, Some(*t), Some(*c), *v),
            _ => return Err(ParseError::Coordinate(s.to_owned())),
        };
        Ok(Self {
            group: group.to_owned(),
            artifact: artifact.to_owned(),
            version: version.to_owned(),
            classifier: classifier.map(str::to_owned),
            kind: kind.map(str::to_owned),
        })
    }
}

impl Serialize for ArtifactCoordinate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ArtifactCoordinate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

/// Canonical form of a repository URL used for every trust comparison.
///
/// Parses with the `url` crate (lower-cases scheme and host) and strips a
/// trailing `/`. Text that does not parse is only trimmed.
pub fn canonical_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let normalized = match url::Url::parse(trimmed) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => trimmed.to_owned(),
    };
    normalized.trim_end_matches('/').to_owned()
}

/// Release or snapshot policy of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryPolicy {
    /// Whether this class of artifacts is served.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How often cached metadata is refreshed.
    #[serde(default = "default_update_policy")]
    pub update_policy: String,
    /// What to do on checksum mismatch.
    #[serde(default = "default_checksum_policy")]
    pub checksum_policy: String,
}

impl RepositoryPolicy {
    /// A disabled policy.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

impl Default for RepositoryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            update_policy: default_update_policy(),
            checksum_policy: default_checksum_policy(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_update_policy() -> String {
    "daily".to_owned()
}
fn default_checksum_policy() -> String {
    "warn".to_owned()
}
fn default_content_type() -> String {
    "default".to_owned()
}

/// Proxy used to reach a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    /// Proxy protocol (`http`, `https`).
    pub protocol: String,
    /// Proxy host.
    pub host: String,
    /// Proxy port.
    pub port: u16,
}

/// Credentials for a repository. The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    /// User name.
    pub username: String,
    /// Password, if any.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authentication")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// A named, URL-addressed source of artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// Repository id. Chosen freely by whoever declares it; never trusted.
    pub id: String,
    /// Transport endpoint. The only identity used by policy.
    pub url: String,
    /// Repository layout.
    #[serde(default = "default_content_type")]
    pub content_type: String,
    /// Release artifact policy.
    #[serde(default)]
    pub releases: RepositoryPolicy,
    /// Snapshot artifact policy.
    #[serde(default = "RepositoryPolicy::disabled")]
    pub snapshots: RepositoryPolicy,
    /// Optional proxy.
    #[serde(default)]
    pub proxy: Option<Proxy>,
    /// Optional credentials.
    #[serde(default)]
    pub authentication: Option<Authentication>,
    /// Repositories this one mirrors.
    #[serde(default)]
    pub mirrored_repositories: Vec<RepositoryRef>,
}

impl RepositoryRef {
    /// A repository with default policies and no proxy, credentials, or mirrors.
    pub fn new(id: &str, url: &str) -> Self {
        Self {
            id: id.to_owned(),
            url: url.to_owned(),
            content_type: default_content_type(),
            releases: RepositoryPolicy::default(),
            snapshots: RepositoryPolicy::disabled(),
            proxy: None,
            authentication: None,
            mirrored_repositories: Vec::new(),
        }
    }

    /// The default public repository: releases daily/warn, snapshots disabled.
    pub fn default_public() -> Self {
        Self::new(DEFAULT_REPOSITORY_ID, DEFAULT_REPOSITORY_URL)
    }

    /// Canonical URL of this repository.
    pub fn canonical_url(&self) -> String {
        canonical_url(&self.url)
    }

    /// Whether `other` addresses the same endpoint.
    pub fn same_url(&self, other: &RepositoryRef) -> bool {
        self.canonical_url() == other.canonical_url()
    }
}

/// Concatenate `first` and `then`, keeping only the first repository for
/// each canonical URL.
pub fn merge_by_url<'a>(
    first: impl IntoIterator<Item = &'a RepositoryRef>,
    then: impl IntoIterator<Item = &'a RepositoryRef>,
) -> Vec<RepositoryRef> {
    let mut merged: Vec<RepositoryRef> = Vec::new();
    for repo in first.into_iter().chain(then) {
        if !merged.iter().any(|r| r.same_url(repo)) {
            merged.push(repo.clone());
        }
    }
    merged
}

/// An artifact file produced by the resolution engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFile {
    /// Coordinate the file was resolved for.
    pub coordinate: ArtifactCoordinate,
    /// Local path of the file.
    pub path: PathBuf,
    /// URL of the repository that supplied it.
    pub repository_url: String,
}
