//! Process logging for the server and CLI binaries.
//!
//! Records from the Rehber crates are emitted at the configured level while
//! third-party crates (hyper, tower) stay at `warn`. With a directory the
//! output rotates by size; without one it goes to stderr.
//!
//! Log lines are `event=... module=... status=...` records carrying ids and
//! counts only. Passwords, tokens, emails in bulk and report contents are
//! never logged.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "rehber";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 5;
const PANIC_PAYLOAD_MAX_CHARS: usize = 160;
/// Crate targets that follow the configured level.
const OWN_TARGETS: &[&str] = &["rehber_core", "rehber_server", "rehber"];
const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    Directory(PathBuf),
}

impl Display for LogTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stderr => f.write_str("stderr"),
            Self::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

#[derive(Debug)]
pub enum LoggingError {
    UnknownLevel(String),
    BadDirectory(String),
    Backend(String),
    /// Logging is already running with a different setup.
    AlreadyActive { active: String, requested: String },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLevel(level) => write!(
                f,
                "unknown log level `{level}`, use one of {}",
                LEVELS.join("|")
            ),
            Self::BadDirectory(detail) => write!(f, "log directory rejected: {detail}"),
            Self::Backend(detail) => write!(f, "log backend failed to start: {detail}"),
            Self::AlreadyActive { active, requested } => {
                write!(f, "logging already active as {active}, cannot switch to {requested}")
            }
        }
    }
}

impl Error for LoggingError {}

struct ActiveLogger {
    level: &'static str,
    target: LogTarget,
    _handle: LoggerHandle,
}

/// Starts logging once per process. Repeating the same call is a no-op.
///
/// `log_dir` must be absolute when given.
pub fn init_logging(level: &str, log_dir: Option<&str>) -> Result<(), LoggingError> {
    let level = parse_level(level)?;
    let target = match log_dir {
        Some(dir) => LogTarget::Directory(absolute_dir(dir)?),
        None => LogTarget::Stderr,
    };

    let active = ACTIVE.get_or_try_init(|| start(level, target.clone()))?;
    if active.level != level || active.target != target {
        return Err(LoggingError::AlreadyActive {
            active: format!("{}@{}", active.level, active.target),
            requested: format!("{level}@{target}"),
        });
    }
    Ok(())
}

/// `(level, target)` once logging is running.
pub fn logging_status() -> Option<(&'static str, LogTarget)> {
    ACTIVE.get().map(|active| (active.level, active.target.clone()))
}

pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start(level: &'static str, target: LogTarget) -> Result<ActiveLogger, LoggingError> {
    let logger = Logger::try_with_str(logger_spec(level))
        .map_err(|err| LoggingError::Backend(err.to_string()))?;
    let logger = match &target {
        LogTarget::Stderr => logger
            .log_to_stderr()
            .format_for_stderr(flexi_logger::detailed_format),
        LogTarget::Directory(dir) => {
            std::fs::create_dir_all(dir)
                .map_err(|err| LoggingError::BadDirectory(format!("{}: {err}", dir.display())))?;
            logger
                .log_to_file(
                    FileSpec::default()
                        .directory(dir.as_path())
                        .basename(LOG_FILE_BASENAME),
                )
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
    };
    let handle = logger
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    install_panic_hook();
    info!(
        "event=logging_init module=core status=ok level={level} target={target} version={}",
        env!("CARGO_PKG_VERSION")
    );
    Ok(ActiveLogger {
        level,
        target,
        _handle: handle,
    })
}

/// `warn` for everything, `level` for the Rehber crates.
fn logger_spec(level: &str) -> String {
    let mut spec = String::from("warn");
    for target in OWN_TARGETS {
        spec.push_str(&format!(",{target}={level}"));
    }
    spec
}

fn parse_level(level: &str) -> Result<&'static str, LoggingError> {
    let lowered = level.trim().to_ascii_lowercase();
    let lowered = if lowered == "warning" { "warn".to_string() } else { lowered };
    LEVELS
        .iter()
        .copied()
        .find(|known| *known == lowered)
        .ok_or(LoggingError::UnknownLevel(lowered))
}

fn absolute_dir(dir: &str) -> Result<PathBuf, LoggingError> {
    let path = Path::new(dir.trim());
    if path.as_os_str().is_empty() || !path.is_absolute() {
        return Err(LoggingError::BadDirectory(format!(
            "`{}` is not an absolute path",
            dir.trim()
        )));
    }
    Ok(path.to_path_buf())
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let location = panic
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic module=core status=error location={location} payload={}",
            one_line(&payload, PANIC_PAYLOAD_MAX_CHARS)
        );
        previous(panic);
    }));
}

/// Flattens newlines and caps length so one record is one line.
fn one_line(value: &str, max_chars: usize) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    let mut out: String = flat.chars().take(max_chars).collect();
    if flat.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_accept_warning_alias() {
        assert_eq!(parse_level(" WARNING ").unwrap(), "warn");
        assert_eq!(parse_level("Info").unwrap(), "info");
        assert!(matches!(
            parse_level("verbose"),
            Err(LoggingError::UnknownLevel(level)) if level == "verbose"
        ));
    }

    #[test]
    fn dependencies_stay_at_warn() {
        assert_eq!(
            logger_spec("debug"),
            "warn,rehber_core=debug,rehber_server=debug,rehber=debug"
        );
    }

    #[test]
    fn relative_log_dir_is_rejected() {
        assert!(absolute_dir("  ").is_err());
        assert!(absolute_dir("logs/rehber").is_err());
    }

    #[test]
    fn one_line_flattens_and_truncates() {
        let line = one_line("first\nsecond\r\nthird", 10);
        assert!(!line.contains('\n'));
        assert!(line.ends_with("..."));
    }

    #[test]
    fn second_init_must_match_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let dir_str = dir.path().to_str().unwrap().to_string();

        init_logging("info", Some(&dir_str)).unwrap();
        init_logging("info", Some(&dir_str)).unwrap();

        assert!(matches!(
            init_logging("debug", Some(&dir_str)),
            Err(LoggingError::AlreadyActive { .. })
        ));
        assert!(matches!(
            init_logging("info", None),
            Err(LoggingError::AlreadyActive { .. })
        ));
        let (level, target) = logging_status().unwrap();
        assert_eq!(level, "info");
        assert_eq!(target, LogTarget::Directory(dir.path().to_path_buf()));
    }
}
