//! Structured logging setup.
//!
//! The filter is read from `TABOO_LOG`, then `RUST_LOG`, and defaults to
//! `info`. The TUI owns the terminal, so the game logs to a file.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::{Mutex, Once};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

fn env_filter(default: &str) -> EnvFilter {
    std::env::var("TABOO_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new(default))
}

/// Send logs to `path`, appending. Calling it twice is harmless; the second
/// subscriber is simply not installed.
pub fn init_file(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    fmt()
        .with_env_filter(env_filter(DEFAULT_FILTER))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .ok();
    Ok(())
}

static TEST_INIT: Once = Once::new();

/// Logging for tests: captured by the test harness, quiet unless asked.
pub fn init_for_tests() {
    TEST_INIT.call_once(|| {
        fmt()
            .with_env_filter(env_filter("warn"))
            .with_test_writer()
            .without_time()
            .try_init()
            .ok();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_for_tests_is_idempotent() {
        init_for_tests();
        init_for_tests();
        tracing::info!("still alive");
    }

    #[test]
    fn init_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("taboo.log");
        init_file(&path).unwrap();
        assert!(path.exists());
    }
}
