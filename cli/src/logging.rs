use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging for the deplan CLI
///
/// Logs are written to:
/// - XDG_DATA_HOME/deplan/logs/ on Unix (typically ~/.local/share/deplan/logs/)
/// - ~/Library/Application Support/deplan/logs/ on macOS
/// - {FOLDERID_LocalAppData}/deplan/logs/ on Windows
///
/// Log files are rotated daily with the pattern: deplan.log.YYYY-MM-DD
///
/// RUST_LOG takes precedence over `verbose`:
/// - RUST_LOG=debug deplan plan ...  (every fetch and wiring decision)
/// - RUST_LOG=warn deplan plan ...   (tolerated override failures only)
pub fn init(verbose: bool) -> Result<()> {
    let log_dir = get_log_dir()?;

    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "deplan.log");

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(false)
                .compact(),
        )
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!("Logging initialized to {}", log_dir.display());

    Ok(())
}

fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "deplan=debug,deplan_cli=debug,deplan_core=debug"
    } else {
        "deplan=info,deplan_cli=info,deplan_core=info"
    }
}

/// Get the log directory path using XDG conventions
fn get_log_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .context("Failed to determine data directory (XDG_DATA_HOME or platform equivalent)")?;

    Ok(data_dir.join("deplan").join("logs"))
}
