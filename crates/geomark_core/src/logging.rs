//! Process-wide diagnostics logging.
//!
//! # Responsibility
//! - Start the rolling file logger once per process.
//! - Capture panics as sanitized log events before the default hook runs.
//!
//! # Invariants
//! - Repeating `init_logging` with the same level and directory is a no-op.
//! - Switching level or directory after start is rejected, never applied.
//! - Nothing in this module panics.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "geomark";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_LOG_FILES: usize = 5;
const PANIC_PAYLOAD_MAX_CHARS: usize = 160;
const SUPPORTED_LEVELS: &str = "trace|debug|info|warn|error";

static ACTIVE_LOGGER: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

struct ActiveLogger {
    level: &'static str,
    log_dir: PathBuf,
    _handle: LoggerHandle,
}

/// Starts file logging at `level` under the absolute directory `log_dir`.
///
/// # Errors
/// - Unknown level, or empty/relative directory.
/// - Directory creation or logger start failure.
/// - Logging already running with a different level or directory.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let level = parse_level(level)?;
    let log_dir = parse_log_dir(log_dir)?;

    let active = ACTIVE_LOGGER.get_or_try_init(|| start_logger(level, &log_dir))?;
    ensure_same_config(active, level, &log_dir)
}

/// Returns `(level, log_dir)` of the running logger, if started.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    ACTIVE_LOGGER
        .get()
        .map(|active| (active.level, active.log_dir.clone()))
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(level: &'static str, log_dir: &Path) -> Result<ActiveLogger, String> {
    std::fs::create_dir_all(log_dir)
        .map_err(|err| format!("cannot create log directory `{}`: {err}", log_dir.display()))?;

    let handle = Logger::try_with_str(level)
        .map_err(|err| format!("logger rejected level `{level}`: {err}"))?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("logger start failed: {err}"))?;

    install_panic_hook();

    info!(
        "event=core_init module=logging status=ok version={} os={} level={} log_dir={}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        level,
        log_dir.display()
    );

    Ok(ActiveLogger {
        level,
        log_dir: log_dir.to_path_buf(),
        _handle: handle,
    })
}

fn ensure_same_config(active: &ActiveLogger, level: &str, log_dir: &Path) -> Result<(), String> {
    if active.log_dir != log_dir {
        return Err(format!(
            "logging already writes to `{}`; refusing to switch to `{}`",
            active.log_dir.display(),
            log_dir.display()
        ));
    }
    if active.level != level {
        return Err(format!(
            "logging already runs at `{}`; refusing to switch to `{level}`",
            active.level
        ));
    }
    Ok(())
}

fn parse_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected {SUPPORTED_LEVELS}"
        )),
    }
}

fn parse_log_dir(log_dir: &str) -> Result<PathBuf, String> {
    let trimmed = log_dir.trim();
    if trimmed.is_empty() {
        return Err("log_dir cannot be empty".to_string());
    }
    let path = PathBuf::from(trimmed);
    if !path.is_absolute() {
        return Err(format!("log_dir must be absolute, got `{trimmed}`"));
    }
    Ok(path)
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        error!(
            "event=panic_captured module=logging status=error location={} payload={}",
            location,
            panic_summary(info)
        );
        previous(info);
    }));
}

fn panic_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = info
        .payload()
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| info.payload().downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    single_line(&payload, PANIC_PAYLOAD_MAX_CHARS)
}

// Payloads may carry coordinates or titles; keep one short line only.
fn single_line(value: &str, max_chars: usize) -> String {
    let flattened = value.replace(['\n', '\r'], " ");
    let mut out: String = flattened.chars().take(max_chars).collect();
    if flattened.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}
