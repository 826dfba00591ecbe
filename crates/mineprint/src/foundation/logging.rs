//! Logging setup and structured logging support
//!
//! The `log` facade is used everywhere in the crate. [`init`] installs
//! `env_logger` writing to stderr and, optionally, to a timestamped file under
//! the application's data directory. The logger can only be installed once per
//! process; later calls are no-ops so a restarted application keeps appending
//! to the same file.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

pub use log::{debug, error, info, trace, warn};

static LOGGER_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter, overridden by `RUST_LOG`
    pub level: String,
    /// Whether to also write a log file
    pub file: bool,
    /// Directory for log files; defaults to `<data dir>/<author>/<name>/Logs`
    pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "trace".to_string(),
            file: true,
            directory: None,
        }
    }
}

/// Per-user data directory for an application, similar to a "pref path"
pub fn pref_path(author: &str, name: &str) -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(author).join(name))
}

/// Resolve the directory log files are written to
pub fn log_directory(config: &LogConfig, author: &str, name: &str) -> Option<PathBuf> {
    config
        .directory
        .clone()
        .or_else(|| pref_path(author, name).map(|path| path.join("Logs")))
}

/// File name for a log started at `time`, e.g. `18-10-2026_14-03-59.txt`
pub fn log_file_name<Tz>(time: &chrono::DateTime<Tz>) -> String
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("{}.txt", time.format("%d-%m-%Y_%H-%M-%S"))
}

/// Install the global logger.
///
/// Returns the path of the log file if one was opened by this call.
pub fn init(config: &LogConfig, author: &str, name: &str) -> Option<PathBuf> {
    if LOGGER_INSTALLED.swap(true, Ordering::SeqCst) {
        // A restarted application reuses the logger (and file) of the first run.
        return None;
    }

    let file = if config.file {
        log_directory(config, author, name).and_then(|dir| open_log_file(&dir))
    } else {
        None
    };

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.level));
    builder.format_timestamp_millis();

    let path = file.as_ref().map(|(path, _)| path.clone());
    if let Some((_, file)) = file {
        builder.target(env_logger::Target::Pipe(Box::new(TeeWriter { file })));
    }

    if builder.try_init().is_err() {
        // Someone else (usually a test harness) already owns the global logger.
        return None;
    }

    if let Some(path) = &path {
        log::info!("Logging to {}", path.display());
    }
    path
}

/// Flush buffered log output at the end of the process
pub fn shutdown() {
    log::info!("Shutting down log");
    log::Log::flush(log::logger());
}

/// Whether [`init`] has been called in this process
pub fn is_initialized() -> bool {
    LOGGER_INSTALLED.load(Ordering::SeqCst)
}

fn open_log_file(dir: &Path) -> Option<(PathBuf, File)> {
    if let Err(e) = fs::create_dir_all(dir) {
        eprintln!("warning: failed to create log directory {}: {e}", dir.display());
        return None;
    }
    let path = dir.join(log_file_name(&chrono::Local::now()));
    match File::create(&path) {
        Ok(file) => Some((path, file)),
        Err(e) => {
            eprintln!("warning: failed to create log file {}: {e}", path.display());
            None
        }
    }
}

/// Writes every record to both stderr and the log file
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_file_name_format() {
        let time = chrono::Utc.with_ymd_and_hms(2026, 10, 18, 14, 3, 59).unwrap();
        assert_eq!(log_file_name(&time), "18-10-2026_14-03-59.txt");
    }

    #[test]
    fn test_log_directory_override() {
        let config = LogConfig {
            directory: Some(PathBuf::from("/tmp/mineprint-logs")),
            ..LogConfig::default()
        };
        assert_eq!(
            log_directory(&config, "Author", "App"),
            Some(PathBuf::from("/tmp/mineprint-logs"))
        );
    }

    #[test]
    fn test_log_directory_defaults_under_pref_path() {
        let config = LogConfig::default();
        if let Some(dir) = log_directory(&config, "Author", "App") {
            assert!(dir.ends_with("Author/App/Logs"));
        }
    }
}
