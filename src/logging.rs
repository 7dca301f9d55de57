// Tracing subscriber setup for the runner
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` wins, otherwise `level` for this crate and warn for the rest
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,snakearena={}", level)))
}

/// Install the global subscriber. With a path, events are appended to that file
/// (the terminal is owned by the TUI); without one they go to stderr.
/// A second call is a no-op.
pub fn init_logging(level: &str, file: Option<&Path>) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(level));

    match file {
        Some(path) => {
            let log_file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(log_file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_to_file_is_idempotent() {
        let path = std::env::temp_dir().join(format!("snakearena-log-{}.log", std::process::id()));
        init_logging("debug", Some(&path)).unwrap();
        init_logging("info", None).unwrap();
        assert!(path.exists());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_unwritable_log_path_is_an_error() {
        let path = std::env::temp_dir().join("snakearena-missing-dir").join("nested").join("x.log");
        assert!(init_logging("info", Some(&path)).is_err());
    }
}
