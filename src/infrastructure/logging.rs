use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt, layer::Layered, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

const LOG_FILE_PREFIX: &str = "kafka-admin.log";

/// Configuration for logging
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_level: Level,
    pub enable_console: bool,
    pub enable_json: bool,
    /// When set, a daily rolling file is written here in addition to the console.
    pub log_dir: Option<PathBuf>,
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            enable_console: true,
            enable_json: false,
            log_dir: None,
            max_files: 7, // Keep a week of daily files
        }
    }
}

type FilteredRegistry = Layered<EnvFilter, Registry>;

/// Filter used when `RUST_LOG` is unset. librdkafka chatter stays at warn.
pub fn default_filter(level: Level) -> String {
    format!(
        "{}={},rdkafka=warn",
        env!("CARGO_PKG_NAME").replace('-', "_"),
        level
    )
}

/// Installs the global subscriber. Console output goes to stderr so command output on
/// stdout stays clean. The returned guard must be held until exit to flush the file writer.
pub fn init_logging(config: Option<LoggingConfig>) -> anyhow::Result<Option<WorkerGuard>> {
    let config = config.unwrap_or_default();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(config.log_level)));

    let mut layers: Vec<Box<dyn Layer<FilteredRegistry> + Send + Sync>> = Vec::new();

    if config.enable_console {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_level(true);
        if config.enable_json {
            layers.push(console_layer.json().boxed());
        } else {
            layers.push(console_layer.with_ansi(true).boxed());
        }
    }

    let mut guard = None;
    if let Some(log_dir) = &config.log_dir {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("creating log directory {}", log_dir.display()))?;
        if let Err(e) = cleanup_old_logs(log_dir, config.max_files) {
            eprintln!("Failed to clean up old logs in {}: {}", log_dir.display(), e);
        }

        let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
        let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);

        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false);
        if config.enable_json {
            layers.push(file_layer.json().boxed());
        } else {
            layers.push(file_layer.boxed());
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(guard)
}

/// Removes the oldest rolled log files so at most `max_files` remain.
pub fn cleanup_old_logs(log_dir: &Path, max_files: usize) -> std::io::Result<usize> {
    if !log_dir.exists() {
        return Ok(0);
    }

    let mut log_files: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with(LOG_FILE_PREFIX))
                .unwrap_or(false)
        })
        .collect();

    if log_files.len() <= max_files {
        return Ok(0);
    }

    // Sort by modification time (oldest first)
    log_files.sort_by_key(|entry| {
        entry
            .metadata()
            .and_then(|meta| meta.modified())
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
    });

    let files_to_remove = log_files.len() - max_files;
    let mut removed = 0;
    for entry in log_files.iter().take(files_to_remove) {
        if fs::remove_file(entry.path()).is_ok() {
            removed += 1;
        }
    }

    Ok(removed)
}
