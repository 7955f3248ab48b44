use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing.
///
/// With `to_file` the log is appended to [`log_path`] so it does not mix with
/// the interactive prompt; otherwise it goes to stderr. `RUST_LOG` overrides
/// the default filter.
pub fn init_logging(verbose: bool, to_file: bool) -> anyhow::Result<()> {
    let filter = if verbose {
        "ai_cli=debug,info"
    } else {
        "ai_cli=info,warn"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if to_file {
        let log_path = log_path();

        // Create parent directory if it doesn't exist
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    Ok(())
}

/// Get the log file path
pub fn log_path() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("ai-cli").join("ai-cli.log")
    } else {
        PathBuf::from("ai-cli.log")
    }
}

/// Get the current log file path for display
pub fn log_path_display() -> String {
    log_path().display().to_string()
}
