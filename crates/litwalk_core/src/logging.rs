//! Process logging.
//!
//! Rolling log files under the configured directory, with warnings (and info
//! lines in verbose mode) echoed to stderr in a short `[LEVEL] message` form.
//!
//! # Invariants
//! - The logger starts at most once per process; later calls must ask for the
//!   same level and directory or they are rejected.
//! - Starting the logger never panics.

use flexi_logger::{
    Cleanup, Criterion, DeferredNow, Duplicate, FileSpec, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info, Record};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::path::{Path, PathBuf};

const FILE_BASENAME: &str = "lit-walk";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_FILES: usize = 5;
const PANIC_SUMMARY_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();

struct ActiveLogger {
    level: &'static str,
    dir: PathBuf,
    _handle: LoggerHandle,
}

/// Starts file logging under `log_dir` at `level`.
///
/// # Errors
/// - `level` is not one of trace, debug, info, warn, error.
/// - `log_dir` is relative or cannot be created.
/// - The logger already runs with another level or directory.
pub fn init_logging(level: &str, log_dir: &Path, verbose: bool) -> Result<(), String> {
    let level = normalize_level(level)?;
    if !log_dir.is_absolute() {
        return Err(format!(
            "log directory must be an absolute path, got `{}`",
            log_dir.display()
        ));
    }

    let active = ACTIVE.get_or_try_init(|| start(level, log_dir, verbose))?;
    if active.level != level || active.dir != log_dir {
        return Err(format!(
            "logging already runs at `{}` in `{}`; refusing to switch to `{level}` in `{}`",
            active.level,
            active.dir.display(),
            log_dir.display()
        ));
    }
    Ok(())
}

fn start(level: &'static str, dir: &Path, verbose: bool) -> Result<ActiveLogger, String> {
    std::fs::create_dir_all(dir)
        .map_err(|err| format!("cannot create log directory `{}`: {err}", dir.display()))?;

    let echo = if verbose {
        Duplicate::Info
    } else {
        Duplicate::Warn
    };
    let handle = Logger::try_with_str(level)
        .map_err(|err| format!("invalid log level `{level}`: {err}"))?
        .log_to_file(FileSpec::default().directory(dir).basename(FILE_BASENAME))
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .duplicate_to_stderr(echo)
        .format_for_stderr(stderr_line)
        .start()
        .map_err(|err| format!("cannot start logger: {err}"))?;

    log_panics();
    info!(
        "event=logging_init module=logging status=ok version={} os={} level={} log_dir={}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        level,
        dir.display()
    );

    Ok(ActiveLogger {
        level,
        dir: dir.to_path_buf(),
        _handle: handle,
    })
}

pub(crate) fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn stderr_line(
    w: &mut dyn std::io::Write,
    _now: &mut DeferredNow,
    record: &Record,
) -> std::io::Result<()> {
    write!(w, "[{}] {}", record.level(), record.args())
}

/// Chains a hook that records panics in the log before the default report.
fn log_panics() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info.location().map_or_else(
            || "unknown".to_string(),
            |loc| format!("{}:{}", loc.file(), loc.line()),
        );
        error!(
            "event=panic module=logging status=error location={} payload={}",
            location,
            one_line(panic_text(info.payload()), PANIC_SUMMARY_CHARS)
        );
        previous(info);
    }));
}

fn panic_text(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Single-line, length-capped rendering of free text.
fn one_line(text: &str, max_chars: usize) -> String {
    let mut line: String = text
        .chars()
        .take(max_chars)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if text.chars().count() > max_chars {
        line.push_str("...");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::{init_logging, normalize_level, one_line, panic_text};
    use std::path::Path;

    #[test]
    fn levels_are_normalized() {
        assert_eq!(normalize_level(" WARNING ").unwrap(), "warn");
        assert_eq!(normalize_level("Debug").unwrap(), "debug");
        assert!(normalize_level("loud").is_err());
    }

    #[test]
    fn relative_directory_is_rejected() {
        let err = init_logging("info", Path::new("logs"), false).unwrap_err();
        assert!(err.contains("absolute"));
    }

    #[test]
    fn one_line_flattens_and_caps() {
        assert_eq!(one_line("a\nb\rc", 10), "a b c");
        assert_eq!(one_line("abcdef", 3), "abc...");
    }

    #[test]
    fn panic_text_reads_str_and_string_payloads() {
        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("boom"));
        assert_eq!(panic_text(owned.as_ref()), "boom");
        let borrowed: Box<dyn std::any::Any + Send> = Box::new("bang");
        assert_eq!(panic_text(borrowed.as_ref()), "bang");
        let other: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_text(other.as_ref()), "non-string panic payload");
    }

    #[test]
    fn second_start_must_match_the_first() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("logs");
        let other = root.path().join("other");

        init_logging("info", &dir, false).unwrap();
        init_logging("INFO", &dir, false).unwrap();
        assert!(dir.is_dir());

        let err = init_logging("debug", &dir, false).unwrap_err();
        assert!(err.contains("refusing to switch"));
        let err = init_logging("info", &other, false).unwrap_err();
        assert!(err.contains("refusing to switch"));
    }
}
