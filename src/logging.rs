use std::{
    fs::{self, DirEntry},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{Context, Result, anyhow};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{self, RollingFileAppender},
};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};
use uuid::Uuid;

use crate::config::{LoggingConfig, LoggingRotation};

const LOG_FILE_PREFIX: &str = "agent.log";

/// Keeps the non-blocking writer alive; dropping it flushes pending log lines.
pub struct LoggingGuard {
    _worker_guard: WorkerGuard,
    run_id: String,
}

impl LoggingGuard {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

pub fn init_tracing(logging_config: &LoggingConfig) -> Result<LoggingGuard> {
    check_logging_config(logging_config)?;
    let env_filter = parse_filter(&logging_config.filter)?;
    let log_dir = open_log_dir(&logging_config.dir)?;

    let purge = purge_expired_logs(&log_dir, LOG_FILE_PREFIX, logging_config.retention_days);
    let (writer, worker_guard) =
        tracing_appender::non_blocking(rolling_appender(&log_dir, &logging_config.rotation));

    let json_file = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(env_filter);
    let stderr_warnings = logging_config.stderr_warn_enabled.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(LevelFilter::WARN)
    });

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(json_file)
        .with(stderr_warnings)
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    let guard = LoggingGuard {
        _worker_guard: worker_guard,
        run_id: Uuid::now_v7().to_string(),
    };
    tracing::info!(
        target: "logging",
        run_id = %guard.run_id,
        dir = %log_dir.display(),
        filter = %logging_config.filter,
        rotation = ?logging_config.rotation,
        retention_days = logging_config.retention_days,
        expired_logs_removed = purge.removed,
        "logging_initialized"
    );
    for warning in &purge.warnings {
        tracing::warn!(target: "logging", warning = %warning, "logging_retention_warning");
    }

    Ok(guard)
}

fn check_logging_config(logging_config: &LoggingConfig) -> Result<()> {
    if logging_config.filter.trim().is_empty() {
        return Err(anyhow!("logging.filter cannot be empty"));
    }
    if logging_config.dir.as_os_str().is_empty() {
        return Err(anyhow!("logging.dir cannot be empty"));
    }
    Ok(())
}

fn parse_filter(filter: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(filter).with_context(|| format!("failed to parse logging.filter '{filter}'"))
}

/// Relative directories resolve against the working directory the agent was started in.
fn open_log_dir(dir: &Path) -> Result<PathBuf> {
    let log_dir = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()
            .context("failed to read current working directory for logging.dir")?
            .join(dir)
    };
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create logging directory {}", log_dir.display()))?;
    Ok(log_dir)
}

fn rolling_appender(log_dir: &Path, rotation: &LoggingRotation) -> RollingFileAppender {
    match rotation {
        LoggingRotation::Daily => rolling::daily(log_dir, LOG_FILE_PREFIX),
        LoggingRotation::Hourly => rolling::hourly(log_dir, LOG_FILE_PREFIX),
    }
}

#[derive(Debug, Default)]
struct PurgeReport {
    removed: usize,
    /// Purge problems never fail startup; they are logged once tracing is up.
    warnings: Vec<String>,
}

fn purge_expired_logs(log_dir: &Path, prefix: &str, retention_days: usize) -> PurgeReport {
    purge_expired_logs_at(log_dir, prefix, retention_days, SystemTime::now())
}

/// Removes `prefix*` files last modified at or before `now - retention_days`.
fn purge_expired_logs_at(
    log_dir: &Path,
    prefix: &str,
    retention_days: usize,
    now: SystemTime,
) -> PurgeReport {
    let retention = Duration::from_secs(retention_days.saturating_mul(24 * 60 * 60) as u64);
    let cutoff = now.checked_sub(retention).unwrap_or(SystemTime::UNIX_EPOCH);
    let mut report = PurgeReport::default();

    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(err) => {
            report
                .warnings
                .push(format!("failed to scan {}: {err}", log_dir.display()));
            return report;
        }
    };

    let candidates = entries.filter(|entry| match entry {
        Ok(entry) => entry.file_name().to_string_lossy().starts_with(prefix),
        Err(_) => true,
    });
    for entry in candidates {
        let outcome = entry
            .map_err(|err| format!("failed to read log directory entry: {err}"))
            .and_then(|entry| remove_if_expired(&entry, cutoff));
        match outcome {
            Ok(true) => report.removed += 1,
            Ok(false) => {}
            Err(warning) => report.warnings.push(warning),
        }
    }

    report
}

fn remove_if_expired(entry: &DirEntry, cutoff: SystemTime) -> std::result::Result<bool, String> {
    let path = entry.path();
    let metadata = entry
        .metadata()
        .map_err(|err| format!("failed to stat {}: {err}", path.display()))?;
    if !metadata.is_file() {
        return Ok(false);
    }
    let modified = metadata
        .modified()
        .map_err(|err| format!("failed to stat {}: {err}", path.display()))?;
    if modified > cutoff {
        return Ok(false);
    }
    fs::remove_file(&path)
        .map(|()| true)
        .map_err(|err| format!("failed to remove expired log {}: {err}", path.display()))
}
