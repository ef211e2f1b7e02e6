//! Console plus rolling-file logging
//!
//! The console gets a human-readable stream; the file layer can emit JSON
//! for later analysis. Both share one `EnvFilter` directive string, which
//! `RUST_LOG` overrides.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

const LOG_FILE_PREFIX: &str = "depth_profiler";
const DEFAULT_LEVEL_FILTER: &str = "info,depth_profiler=info";

/// Logging configuration options
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Directory to store log files
    pub log_dir: String,
    /// Log level filter (e.g., "info", "depth_profiler=debug")
    pub level_filter: String,
    pub rotation: LogRotation,
    /// Whether to include timestamps in console output
    pub console_timestamps: bool,
    /// Whether to use JSON format for file logs
    pub file_json_format: bool,
    /// Days to keep rotated files
    pub cleanup_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Daily,
    Hourly,
    /// Single file, never rotated
    Never,
}

impl LogRotation {
    /// Unknown names fall back to daily rotation
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "hourly" => LogRotation::Hourly,
            "never" => LogRotation::Never,
            _ => LogRotation::Daily,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            level_filter: DEFAULT_LEVEL_FILTER.to_string(),
            rotation: LogRotation::Daily,
            console_timestamps: true,
            file_json_format: true,
            cleanup_days: 30,
        }
    }
}

/// Initialize console + rotating file logging
///
/// Files land in `<log_dir>/depth_profiler.log.<date>`. The returned guard
/// must be held for the life of the process or buffered lines are lost.
pub fn init_dual_logging(config: &LoggingConfig) -> Result<WorkerGuard, Box<dyn std::error::Error + Send + Sync>> {
    std::fs::create_dir_all(&config.log_dir)?;

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level_filter));
    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level_filter));

    let file_name = format!("{}.log", LOG_FILE_PREFIX);
    let file_appender = match config.rotation {
        LogRotation::Daily => tracing_appender::rolling::daily(&config.log_dir, file_name),
        LogRotation::Hourly => tracing_appender::rolling::hourly(&config.log_dir, file_name),
        LogRotation::Never => tracing_appender::rolling::never(&config.log_dir, file_name),
    };
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_level(true)
        .with_target(true)
        .with_timer(if config.console_timestamps {
            ChronoUtc::new("%Y-%m-%d %H:%M:%S%.3f UTC".to_string())
        } else {
            ChronoUtc::new(String::new())
        })
        .with_filter(console_filter);

    let file_layer = if config.file_json_format {
        fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_target(true)
            .with_thread_names(true)
            .with_timer(ChronoUtc::new("%Y-%m-%dT%H:%M:%S%.3fZ".to_string()))
            .with_filter(file_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_target(true)
            .with_thread_names(true)
            .with_timer(ChronoUtc::new("%Y-%m-%d %H:%M:%S%.3f UTC".to_string()))
            .with_filter(file_filter)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(
        log_dir = %config.log_dir,
        rotation = ?config.rotation,
        json_format = config.file_json_format,
        "📁 Logging initialized - console + rotating files"
    );

    Ok(guard)
}

/// Console-only logging for tests and minimal runs
pub fn init_simple_logging() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL_FILTER)),
        )
        .try_init()?;
    Ok(())
}

fn is_profiler_log(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX) && name.contains(".log"))
}

/// Log files written by this process, oldest name first
pub fn get_current_log_files(log_dir: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(log_dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| is_profiler_log(path))
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

/// Remove log files last modified more than `keep_days` ago
pub fn cleanup_old_logs(log_dir: &str, keep_days: u32) -> Result<usize, std::io::Error> {
    let cutoff_time = SystemTime::now() - Duration::from_secs(u64::from(keep_days) * 24 * 3600);
    let mut removed_count = 0;

    for path in get_current_log_files(log_dir) {
        let modified = path.metadata().and_then(|m| m.modified());
        if let Ok(modified) = modified {
            if modified < cutoff_time {
                std::fs::remove_file(&path)?;
                removed_count += 1;
                tracing::debug!("🗑️ Removed old log file: {:?}", path);
            }
        }
    }

    if removed_count > 0 {
        tracing::info!("🧹 Cleaned up {} old log files (older than {} days)", removed_count, keep_days);
    }

    Ok(removed_count)
}

pub fn log_system_info() {
    tracing::info!(
        package_version = env!("CARGO_PKG_VERSION"),
        target_arch = std::env::consts::ARCH,
        target_os = std::env::consts::OS,
        cpu_count = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        "📊 Environment information logged"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.log_dir, "logs");
        assert_eq!(config.level_filter, "info,depth_profiler=info");
        assert_eq!(config.rotation, LogRotation::Daily);
        assert_eq!(config.cleanup_days, 30);
        assert!(config.file_json_format);
    }

    #[test]
    fn test_rotation_parse() {
        assert_eq!(LogRotation::parse("hourly"), LogRotation::Hourly);
        assert_eq!(LogRotation::parse("Never"), LogRotation::Never);
        assert_eq!(LogRotation::parse("size:100"), LogRotation::Daily);
    }

    #[test]
    fn test_get_current_log_files() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path();

        std::fs::write(log_dir.join("depth_profiler.log.2025-01-01"), "test").unwrap();
        std::fs::write(log_dir.join("depth_profiler.log.2025-01-02"), "test").unwrap();
        std::fs::write(log_dir.join("other.log"), "test").unwrap();
        std::fs::create_dir(log_dir.join("depth_profiler.log.dir")).unwrap();

        let log_files = get_current_log_files(log_dir.to_str().unwrap());
        assert_eq!(log_files.len(), 2);
        assert!(log_files[0].to_str().unwrap().ends_with("2025-01-01"));
        assert!(log_files[1].to_str().unwrap().ends_with("2025-01-02"));
    }

    #[test]
    fn test_cleanup_keeps_recent_logs() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path();
        std::fs::write(log_dir.join("depth_profiler.log.today"), "recent").unwrap();

        let removed = cleanup_old_logs(log_dir.to_str().unwrap(), 7).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(get_current_log_files(log_dir.to_str().unwrap()).len(), 1);
    }

    #[test]
    fn test_cleanup_zero_days_removes_everything() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path();
        std::fs::write(log_dir.join("depth_profiler.log.old"), "old").unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let removed = cleanup_old_logs(log_dir.to_str().unwrap(), 0).unwrap();
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_cleanup_missing_dir() {
        assert_eq!(cleanup_old_logs("/nonexistent/depth_profiler/logs", 7).unwrap(), 0);
    }
}
