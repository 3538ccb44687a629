//! Where trustgate's `tracing` events go.
//!
//! The binary runs one-shot commands, so stderr output ([`init_cli`]) is the
//! default. Passing `--log-dir` ([`init_production`]) additionally keeps a
//! JSON trail of every policy event in daily files, which is what an
//! operator would ship to a log collector next to the decision audit log.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// File name prefix of the rotated log files.
pub const LOG_FILE_PREFIX: &str = "trustgate.log";

/// Keeps the background log writer alive.
///
/// Hold it until the command finishes; buffered JSON lines are written out
/// when it drops.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// `RUST_LOG`, or `info` when unset or unparsable.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log to stderr and to `{logs_dir}/trustgate.log.<date>` as JSON lines.
///
/// If another subscriber is already installed (tests embedding the crate),
/// it wins and only the directory and writer are set up.
///
/// # Errors
///
/// Fails when `logs_dir` cannot be created.
pub fn init_production(logs_dir: &Path) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("failed to create logs directory {}", logs_dir.display()))?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX));

    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().json().with_writer(file_writer))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
    if installed.is_err() {
        tracing::debug!("global subscriber already set");
    }

    Ok(LoggingGuard { _guard: guard })
}

/// Human-readable events on stderr only, keeping stdout for command output.
pub fn init_cli() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init();
}
