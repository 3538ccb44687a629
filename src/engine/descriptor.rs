//! Descriptor model and a minimal TOML descriptor format.
//!
//! ```toml
//! [project]
//! group = "org.example"
//! artifact = "app"
//! version = "1.0"
//! packaging = "bundle"
//!
//! [[repositories]]
//! id = "extra"
//! url = "https://repo.example.com/releases"
//!
//! [[plugin_repositories]]
//! id = "extra-plugins"
//! url = "https://repo.example.com/plugins"
//!
//! [[dependencies]]
//! coordinate = "org.example:lib:2.0"
//!
//! [[extensions]]
//! coordinate = "org.example:bundle-ext:1.0"
//! lifecycles = ["bundle"]
//!
//! [[plugins]]
//! coordinate = "org.example:compiler-plugin:3.1"
//! extensions = true
//! ```

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{DescriptorError, DescriptorLoader};
use crate::types::{merge_by_url, ArtifactCoordinate, RepositoryRef};

/// `[project]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Group id.
    pub group: String,
    /// Artifact id.
    pub artifact: String,
    /// Version.
    pub version: String,
    /// Packaging, which selects the lifecycle.
    #[serde(default = "default_packaging")]
    pub packaging: String,
}

fn default_packaging() -> String {
    "jar".to_owned()
}

fn default_scope() -> String {
    "compile".to_owned()
}

/// A declared dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDeclaration {
    /// Coordinate of the dependency.
    pub coordinate: ArtifactCoordinate,
    /// Dependency scope.
    #[serde(default = "default_scope")]
    pub scope: String,
}

/// A declared build extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionDeclaration {
    /// Coordinate of the extension.
    pub coordinate: ArtifactCoordinate,
    /// Packagings whose lifecycle this extension contributes.
    #[serde(default)]
    pub lifecycles: Vec<String>,
}

/// A declared build plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDeclaration {
    /// Coordinate of the plugin.
    pub coordinate: ArtifactCoordinate,
    /// Whether the plugin is loaded as an extension.
    #[serde(default)]
    pub extensions: bool,
    /// Packagings whose lifecycle this plugin contributes as an extension.
    #[serde(default)]
    pub lifecycles: Vec<String>,
}

/// How a piece of extension code was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionKind {
    /// `[[extensions]]` entry.
    Build,
    /// `[[plugins]]` entry with `extensions = true`.
    Plugin,
}

/// Extension code the engine would load into its own process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclaredExtension {
    /// Coordinate.
    pub coordinate: ArtifactCoordinate,
    /// Declaration kind.
    pub kind: ExtensionKind,
    /// Lifecycles contributed.
    pub lifecycles: Vec<String>,
}

/// The raw project model, exactly as declared. Filtering never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorModel {
    /// Project identity.
    pub project: ProjectInfo,
    /// Repositories for ordinary dependencies.
    #[serde(default)]
    pub repositories: Vec<RepositoryRef>,
    /// Repositories for plugins and extensions.
    #[serde(default)]
    pub plugin_repositories: Vec<RepositoryRef>,
    /// Dependencies.
    #[serde(default)]
    pub dependencies: Vec<DependencyDeclaration>,
    /// Build extensions.
    #[serde(default)]
    pub extensions: Vec<ExtensionDeclaration>,
    /// Build plugins.
    #[serde(default)]
    pub plugins: Vec<PluginDeclaration>,
}

impl DescriptorModel {
    /// Parse TOML text.
    ///
    /// # Errors
    ///
    /// Returns the parser message if the text is not a valid descriptor.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Repositories declared for ordinary resolution.
    pub fn declared_repositories(&self) -> &[RepositoryRef] {
        &self.repositories
    }

    /// Repositories declared for plugins and extensions.
    pub fn declared_plugin_repositories(&self) -> &[RepositoryRef] {
        &self.plugin_repositories
    }

    /// Declared dependencies.
    pub fn declared_dependencies(&self) -> &[DependencyDeclaration] {
        &self.dependencies
    }

    /// Declared plugins, including extension plugins.
    pub fn declared_plugins(&self) -> &[PluginDeclaration] {
        &self.plugins
    }

    /// Build extensions followed by plugins loaded as extensions.
    pub fn declared_extensions(&self) -> Vec<DeclaredExtension> {
        let build = self.extensions.iter().map(|e| DeclaredExtension {
            coordinate: e.coordinate.clone(),
            kind: ExtensionKind::Build,
            lifecycles: e.lifecycles.clone(),
        });
        let plugins = self
            .plugins
            .iter()
            .filter(|p| p.extensions)
            .map(|p| DeclaredExtension {
                coordinate: p.coordinate.clone(),
                kind: ExtensionKind::Plugin,
                lifecycles: p.lifecycles.clone(),
            });
        build.chain(plugins).collect()
    }

    /// Repositories that would supply extension and plugin code.
    ///
    /// Descriptor plugin repositories first, then `trusted_plugin`, with
    /// duplicate URLs removed (first occurrence wins).
    pub fn extension_repositories(&self, trusted_plugin: &[RepositoryRef]) -> Vec<RepositoryRef> {
        merge_by_url(&self.plugin_repositories, trusted_plugin)
    }
}

/// Reads descriptors in the TOML format shown in the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlDescriptorLoader;

#[async_trait]
impl DescriptorLoader for TomlDescriptorLoader {
    async fn load_descriptor(&self, path: &Path) -> Result<DescriptorModel, DescriptorError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| DescriptorError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
        DescriptorModel::from_toml_str(&contents).map_err(|e| DescriptorError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
