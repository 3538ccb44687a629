//! trustgate CLI entry point.
//!
//! Provides `audit`, `load`, `resolve`, and `allow-list` subcommands over a
//! guarded loader backed by local `file://` repositories.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use trustgate::config::TrustConfig;
use trustgate::engine::{DescriptorLoader, FileSystemEngine, TomlDescriptorLoader};
use trustgate::loader::{GuardedLoader, LoadedProject, PolicyReport};
use trustgate::types::ArtifactCoordinate;

/// trustgate: trust-boundary enforcement for descriptor loading.
#[derive(Parser)]
#[command(name = "trustgate", version, about)]
struct Cli {
    /// Config file (default: `$TRUSTGATE_CONFIG` or `~/.trustgate/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write JSON logs to this directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Report what loading a descriptor would allow and block, without fetching.
    Audit {
        /// Descriptor file.
        descriptor: PathBuf,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Load a descriptor through every gate.
    Load {
        /// Descriptor file.
        descriptor: PathBuf,
        /// Also resolve declared dependencies.
        #[arg(long)]
        resolve: bool,
    },
    /// Resolve one artifact against the trusted repositories.
    Resolve {
        /// Coordinate as `group:artifact[:type[:classifier]]:version`.
        coordinate: String,
    },
    /// Print the effective allow-list.
    AllowList {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let _logging_guard = match &cli.log_dir {
        Some(dir) => Some(trustgate::logging::init_production(dir)?),
        None => {
            trustgate::logging::init_cli();
            None
        }
    };

    let config = TrustConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let loader = GuardedLoader::from_config(
        &config,
        Arc::new(FileSystemEngine::new()),
        Arc::new(TomlDescriptorLoader),
    )
    .context("failed to build loader")?;
    debug!(?loader, "loader ready");

    match cli.command {
        Command::Audit { descriptor, json } => handle_audit(&loader, &descriptor, json).await,
        Command::Load {
            descriptor,
            resolve,
        } => handle_load(&loader, &descriptor, resolve).await,
        Command::Resolve { coordinate } => handle_resolve(&loader, &coordinate).await,
        Command::AllowList { json } => handle_allow_list(&loader, json),
    }
}

/// Dry-run every gate and print the report.
async fn handle_audit(loader: &GuardedLoader, path: &Path, json: bool) -> anyhow::Result<()> {
    let descriptor = TomlDescriptorLoader
        .load_descriptor(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let report = loader.evaluate(&descriptor);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.would_abort() {
        anyhow::bail!(
            "loading {} would be rejected: {} untrusted extension source(s)",
            path.display(),
            report.rejections.len()
        );
    }
    Ok(())
}

fn print_report(report: &PolicyReport) {
    println!("project    {}", report.project);
    for repo in &report.repositories {
        let verdict = if repo.allowed { "allowed" } else { "dropped" };
        println!("repository {:<8} {} ({})", verdict, repo.url, repo.id);
    }
    for ext in &report.extensions {
        let verdict = if ext.admitted { "admitted" } else { "blocked" };
        println!("extension  {:<8} {}", verdict, ext.extension.coordinate);
    }
    for rejection in &report.rejections {
        println!("rejected   {rejection}");
    }
}

/// Load a descriptor and print what was wired in.
async fn handle_load(loader: &GuardedLoader, path: &Path, resolve: bool) -> anyhow::Result<()> {
    let project = loader
        .load_descriptor(path, resolve)
        .await
        .with_context(|| format!("failed to load {}", path.display()))?;
    print_project(&project);

    project
        .project_lifecycle()
        .with_context(|| format!("project {} cannot be built", path.display()))?;
    info!(load_id = %project.load_id, "load complete");
    Ok(())
}

fn print_project(project: &LoadedProject) {
    println!("load       {}", project.load_id);
    for repo in &project.dependency_repositories {
        println!("repository {} ({})", repo.url, repo.id);
    }
    for realm in &project.extensions {
        let verdict = if realm.is_empty() { "empty" } else { "loaded" };
        println!("extension  {:<8} {}", verdict, realm.extension.coordinate);
    }
    for file in &project.dependencies {
        println!("dependency {} {}", file.coordinate, file.path.display());
    }
}

/// Resolve one coordinate and print its path.
async fn handle_resolve(loader: &GuardedLoader, coordinate: &str) -> anyhow::Result<()> {
    let coord: ArtifactCoordinate = coordinate
        .parse()
        .with_context(|| format!("invalid coordinate '{coordinate}'"))?;
    let file = loader.resolve_artifact(&coord).await?;
    println!("{}", file.path.display());
    Ok(())
}

/// Print the effective allow-list.
fn handle_allow_list(loader: &GuardedLoader, json: bool) -> anyhow::Result<()> {
    let allow_list = loader.boundary().allow_list();
    let extensions = allow_list.extension_keys();
    let repositories = allow_list.repository_urls();

    if json {
        let value = serde_json::json!({
            "extensions": extensions,
            "repositories": repositories,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match extensions {
        Some(keys) => {
            for key in keys {
                println!("extension  {key}");
            }
        }
        None => println!("extension  * (enforcement disabled)"),
    }
    for url in repositories {
        println!("repository {url}");
    }
    Ok(())
}
