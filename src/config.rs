//! Configuration loading.
//!
//! Loads `trust.toml` from `$TRUSTGATE_CONFIG` or `~/.trustgate/config.toml`.
//! A missing file yields defaults. Environment variables are read here and
//! nowhere else; the policy layer only ever sees the resulting
//! [`TrustConfig`].
//!
//! Precedence for allow-list entries: default seed, then environment
//! lists, then the file's explicit entries (all are merged, none replace).

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::types::{RepositoryRef, DEFAULT_REPOSITORY_ID};

/// Path override for the config file.
pub const ENV_CONFIG_PATH: &str = "TRUSTGATE_CONFIG";
/// Comma-separated `group:artifact` keys of trusted extensions.
pub const ENV_ALLOW_EXTENSIONS: &str = "TRUSTGATE_ALLOW_EXTENSIONS";
/// Comma-separated trusted repository URLs.
pub const ENV_ALLOW_REPOSITORIES: &str = "TRUSTGATE_ALLOW_REPOSITORIES";
/// `false` switches extension enforcement off (allow-all).
pub const ENV_ENFORCE_EXTENSIONS: &str = "TRUSTGATE_ENFORCE_EXTENSIONS";
/// Path of the JSON-lines decision audit log.
pub const ENV_AUDIT_LOG: &str = "TRUSTGATE_AUDIT_LOG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Extension allow-list.
    pub extensions: ExtensionsConfig,
    /// Repository allow-list and caller-trusted repositories.
    pub repositories: RepositoriesConfig,
    /// Decision audit log.
    pub audit: AuditConfig,
}

/// `[extensions]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtensionsConfig {
    /// Enforce the extension allow-list. `false` admits every extension.
    pub enforce: bool,
    /// Trusted `group:artifact` keys.
    pub allow: Vec<String>,
    /// Raw comma list taken from [`ENV_ALLOW_EXTENSIONS`].
    #[serde(skip)]
    pub env_allow: Option<String>,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            enforce: true,
            allow: Vec::new(),
            env_allow: None,
        }
    }
}

/// `[repositories]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RepositoriesConfig {
    /// Seed the allow-list with the default public repository.
    pub seed_default: bool,
    /// Trusted repository URLs.
    pub allow: Vec<String>,
    /// Repositories from the caller's own settings, always trusted.
    pub trusted: Vec<RepositoryRef>,
    /// Plugin repositories from the caller's own settings, always trusted.
    pub trusted_plugin: Vec<RepositoryRef>,
    /// Raw comma list taken from [`ENV_ALLOW_REPOSITORIES`].
    #[serde(skip)]
    pub env_allow: Option<String>,
}

impl Default for RepositoriesConfig {
    fn default() -> Self {
        Self {
            seed_default: true,
            allow: Vec::new(),
            trusted: Vec::new(),
            trusted_plugin: Vec::new(),
            env_allow: None,
        }
    }
}

/// `[audit]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Append decisions as JSON lines to this file.
    pub log_path: Option<PathBuf>,
}

impl TrustConfig {
    /// Load from `path` (or the default location) and apply environment
    /// overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load using a custom environment resolver (avoids `set_var` in tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_with(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path_with(&env)?,
        };
        let mut config = Self::load_from_file(&path)?;
        config.apply_overrides(env);
        Ok(config)
    }

    /// Parse TOML text without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration.
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).context("failed to parse config TOML")
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml_str(&contents)
                    .with_context(|| format!("failed to load config at {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config at {}: {e}",
                path.display()
            )),
        }
    }

    /// Apply environment overrides.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env(ENV_ALLOW_EXTENSIONS) {
            self.extensions.env_allow = Some(v);
        }
        if let Some(v) = env(ENV_ALLOW_REPOSITORIES) {
            self.repositories.env_allow = Some(v);
        }
        if let Some(v) = env(ENV_ENFORCE_EXTENSIONS) {
            match v.trim().parse::<bool>() {
                Ok(enforce) => self.extensions.enforce = enforce,
                Err(_) => tracing::warn!(
                    var = ENV_ENFORCE_EXTENSIONS,
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env(ENV_AUDIT_LOG) {
            self.audit.log_path = Some(PathBuf::from(v));
        }
    }

    /// Caller-trusted repositories.
    ///
    /// When the default seed is on and no entry uses the default id, the
    /// default public repository is appended, as settings-based engines do.
    pub fn trusted_repositories(&self) -> Vec<RepositoryRef> {
        with_default_public(&self.repositories.trusted, self.repositories.seed_default)
    }

    /// Caller-trusted plugin repositories, completed the same way.
    pub fn trusted_plugin_repositories(&self) -> Vec<RepositoryRef> {
        with_default_public(
            &self.repositories.trusted_plugin,
            self.repositories.seed_default,
        )
    }
}

fn with_default_public(repos: &[RepositoryRef], seed_default: bool) -> Vec<RepositoryRef> {
    let mut result = repos.to_vec();
    if seed_default && !result.iter().any(|r| r.id == DEFAULT_REPOSITORY_ID) {
        result.push(RepositoryRef::default_public());
    }
    result
}

/// Resolve the default config directory (`~/.trustgate/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".trustgate"))
}

/// Resolve the config file path using a custom env resolver.
///
/// # Errors
///
/// Returns an error if no override is set and the home directory is unknown.
pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> anyhow::Result<PathBuf> {
    if let Some(p) = env(ENV_CONFIG_PATH) {
        return Ok(PathBuf::from(p));
    }
    Ok(config_dir()?.join("config.toml"))
}
