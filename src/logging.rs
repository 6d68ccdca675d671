use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::app_dirs::AppDirs;

/// Environment variable holding a tracing filter directive
pub const LOG_ENV: &str = "KWIZ_LOG";

/// Route tracing output to a log file; the terminal belongs to the UI.
///
/// Returns the log file path, or `None` when no location could be resolved.
pub fn init(verbose: bool) -> io::Result<Option<PathBuf>> {
    let Some(path) = AppDirs::log_path() else {
        return Ok(None);
    };
    init_at(&path, verbose)?;
    Ok(Some(path))
}

pub fn init_at(path: &Path, verbose: bool) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
    Ok(())
}
